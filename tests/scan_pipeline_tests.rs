//! Integration tests for the scan passes
//!
//! Each test drives the real controller against fake Plex/TMDB collaborators
//! and an in-memory catalog.

mod common;

use std::sync::atomic::Ordering;

use assert_matches::assert_matches;

use common::{FakeMetadata, Harness, movie_item, show_item};
use gapscan::ScanError;
use gapscan::catalog::{Completeness, EpisodeKey, MediaKind};

const PAST: &str = "2001-01-01";
const FUTURE: &str = "2999-01-01";

async fn episode_rows(h: &Harness, title: &str) -> Vec<(i32, i32, bool)> {
    let show = h.db.shows().get_by_title(title).await.unwrap().unwrap();
    h.db.episodes()
        .list_for_show(show.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| (e.season_number, e.episode_number, e.exists_in_plex))
        .collect()
}

// ============================================================================
// TV pass
// ============================================================================

mod tv {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_incomplete_upcoming_show() {
        let h = Harness::new().await;
        h.metadata.add_show(
            100,
            "Example",
            "Returning Series",
            &[&[(1, PAST), (2, PAST), (3, PAST)], &[(1, FUTURE)]],
        );
        h.library
            .set(MediaKind::Tv, vec![show_item("Example", Some(100), &[(1, 1), (1, 2)])]);

        let status = h.run(MediaKind::Tv).await;
        assert_eq!(status.status_message, "Scan complete: 1 of 1 items");
        assert_eq!(status.percent, 100);

        let show = h.db.shows().get_by_title("Example").await.unwrap().unwrap();
        assert_eq!(show.status, "Incomplete");
        assert_eq!(show.series_status, "Incomplete - Upcoming");
        assert_eq!(show.tmdb_id, Some(100));

        let missing: Vec<EpisodeKey> = h
            .db
            .episodes()
            .list_missing(show.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| EpisodeKey::new(e.season_number, e.episode_number))
            .collect();
        assert_eq!(missing, vec![EpisodeKey::new(1, 3), EpisodeKey::new(2, 1)]);
    }

    #[tokio::test]
    async fn test_complete_ended_show() {
        let h = Harness::new().await;
        h.metadata.add_show(7, "Finished", "Ended", &[&[(1, PAST), (2, PAST)]]);
        h.library
            .set(MediaKind::Tv, vec![show_item("Finished", Some(7), &[(1, 1), (1, 2)])]);

        h.run(MediaKind::Tv).await;

        let show = h.db.shows().get_by_title("Finished").await.unwrap().unwrap();
        assert_eq!(show.status, Completeness::Complete.to_string());
        assert_eq!(show.series_status, "Complete - Ended");
    }

    #[tokio::test]
    async fn test_untagged_show_is_resolved_by_search() {
        let h = Harness::new().await;
        h.metadata.add_show(55, "Searched", "Ended", &[&[(1, PAST)]]);
        h.metadata.add_search("Searched", 55);
        h.library.set(MediaKind::Tv, vec![show_item("Searched", None, &[])]);

        h.run(MediaKind::Tv).await;

        let show = h.db.shows().get_by_title("Searched").await.unwrap().unwrap();
        assert_eq!(show.tmdb_id, Some(55));
        assert_eq!(show.status, "Incomplete");
    }

    #[tokio::test]
    async fn test_unresolvable_show_is_unknown() {
        let h = Harness::new().await;
        h.library.set(MediaKind::Tv, vec![show_item("Mystery", None, &[(1, 1)])]);

        let status = h.run(MediaKind::Tv).await;
        assert_eq!(status.processed, 1);

        let show = h.db.shows().get_by_title("Mystery").await.unwrap().unwrap();
        assert_eq!(show.status, "Unknown");
        assert_eq!(show.series_status, "Unknown");
        assert_eq!(h.count("seasons").await, 0);
    }

    #[tokio::test]
    async fn test_passes_are_idempotent() {
        let h = Harness::new().await;
        h.metadata.add_show(1, "A", "Returning Series", &[&[(1, PAST), (2, FUTURE)]]);
        h.metadata.add_show(2, "B", "Ended", &[&[(1, PAST)], &[(1, PAST)]]);
        h.library.set(
            MediaKind::Tv,
            vec![show_item("A", Some(1), &[(1, 1)]), show_item("B", Some(2), &[(2, 1)])],
        );

        h.run(MediaKind::Tv).await;
        let first = (
            episode_rows(&h, "A").await,
            episode_rows(&h, "B").await,
            h.ids("shows").await,
            h.ids("seasons").await,
            h.ids("episodes").await,
        );
        let first_status = h.db.shows().get_by_title("B").await.unwrap().unwrap().series_status;

        h.run(MediaKind::Tv).await;
        let second = (
            episode_rows(&h, "A").await,
            episode_rows(&h, "B").await,
            h.ids("shows").await,
            h.ids("seasons").await,
            h.ids("episodes").await,
        );
        let second_status = h.db.shows().get_by_title("B").await.unwrap().unwrap().series_status;

        assert_eq!(first, second);
        assert_eq!(first_status, second_status);
    }

    #[tokio::test]
    async fn test_removed_show_leaves_no_rows() {
        let h = Harness::new().await;
        h.metadata.add_show(1, "Kept", "Ended", &[&[(1, PAST)]]);
        h.metadata.add_show(2, "Removed", "Ended", &[&[(1, PAST), (2, PAST)], &[(1, PAST)]]);
        h.library.set(
            MediaKind::Tv,
            vec![show_item("Kept", Some(1), &[]), show_item("Removed", Some(2), &[(1, 1)])],
        );
        h.run(MediaKind::Tv).await;
        assert_eq!(h.count("episodes").await, 4);

        h.library.set(MediaKind::Tv, vec![show_item("Kept", Some(1), &[])]);
        h.run(MediaKind::Tv).await;

        assert!(h.db.shows().get_by_title("Removed").await.unwrap().is_none());
        assert_eq!(h.count("shows").await, 1);
        assert_eq!(h.count("seasons").await, 1);
        assert_eq!(h.count("episodes").await, 1);
    }

    #[tokio::test]
    async fn test_deleted_file_is_missing_again() {
        let h = Harness::new().await;
        h.metadata.add_show(1, "Show", "Ended", &[&[(1, PAST), (2, PAST)]]);
        h.library
            .set(MediaKind::Tv, vec![show_item("Show", Some(1), &[(1, 1), (1, 2)])]);
        h.run(MediaKind::Tv).await;
        assert_eq!(h.db.shows().get_by_title("Show").await.unwrap().unwrap().status, "Complete");

        h.library.set(MediaKind::Tv, vec![show_item("Show", Some(1), &[(1, 1)])]);
        h.run(MediaKind::Tv).await;

        assert_eq!(
            episode_rows(&h, "Show").await,
            vec![(1, 1, true), (1, 2, false)]
        );
        assert_eq!(h.db.shows().get_by_title("Show").await.unwrap().unwrap().status, "Incomplete");
    }

    #[tokio::test]
    async fn test_library_failure_does_not_purge() {
        let h = Harness::new().await;
        h.metadata.add_show(1, "Kept", "Ended", &[&[(1, PAST)]]);
        h.library.set(MediaKind::Tv, vec![show_item("Kept", Some(1), &[])]);
        h.run(MediaKind::Tv).await;

        h.library.fail.store(true, Ordering::SeqCst);
        let status = h.run(MediaKind::Tv).await;

        assert!(status.status_message.starts_with("Scan failed:"), "{}", status.status_message);
        assert!(!status.in_progress);
        assert_eq!(h.count("shows").await, 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_ends_pass() {
        let h = Harness::new().await;
        h.library.set(MediaKind::Tv, vec![show_item("Any", None, &[])]);
        h.db.pool().close().await;

        let status = h.run(MediaKind::Tv).await;

        assert!(!status.in_progress);
        assert!(!status.stop_requested);
        assert!(
            status.status_message.starts_with("Scan failed: catalog write failed"),
            "{}",
            status.status_message
        );
    }
}

// ============================================================================
// Controller
// ============================================================================

mod controller {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_cross_kind_already_running() {
        let h = Harness::with_metadata(FakeMetadata::gated()).await;
        h.metadata.add_show(1, "Held", "Ended", &[&[(1, PAST)]]);
        h.library.set(MediaKind::Tv, vec![show_item("Held", Some(1), &[])]);

        h.controller.start(MediaKind::Tv).unwrap();
        assert_matches!(
            h.controller.start(MediaKind::Movie),
            Err(ScanError::AlreadyRunning(MediaKind::Tv))
        );
        assert_matches!(
            h.controller.start(MediaKind::Tv),
            Err(ScanError::AlreadyRunning(MediaKind::Tv))
        );

        h.metadata.open_gate();
        h.wait_idle(MediaKind::Tv).await;

        h.controller.start(MediaKind::Movie).unwrap();
        h.wait_idle(MediaKind::Movie).await;
    }

    #[tokio::test]
    async fn test_running_movie_scan_blocks_tv() {
        let h = Harness::with_metadata(FakeMetadata::gated()).await;
        h.metadata.add_movie(1, "Held", None);
        h.library.set(MediaKind::Movie, vec![movie_item("Held", Some(1))]);

        h.controller.start(MediaKind::Movie).unwrap();
        h.wait_for_item(MediaKind::Movie, "Held").await;
        assert_matches!(
            h.controller.start(MediaKind::Tv),
            Err(ScanError::AlreadyRunning(MediaKind::Movie))
        );
        assert!(!h.controller.status(MediaKind::Tv).in_progress);

        h.metadata.open_gate();
        h.wait_idle(MediaKind::Movie).await;

        h.controller.start(MediaKind::Tv).unwrap();
        h.wait_idle(MediaKind::Tv).await;
    }

    #[tokio::test]
    async fn test_stop_mid_pass() {
        let h = Harness::with_metadata(FakeMetadata::gated()).await;
        for (id, title) in [(1, "One"), (2, "Two"), (3, "Three")] {
            h.metadata.add_show(id, title, "Ended", &[&[(1, PAST)]]);
        }
        h.library.set(
            MediaKind::Tv,
            vec![
                show_item("One", Some(1), &[]),
                show_item("Two", Some(2), &[]),
                show_item("Three", Some(3), &[]),
            ],
        );

        h.controller.start(MediaKind::Tv).unwrap();
        h.wait_for_item(MediaKind::Tv, "One").await;

        h.controller.request_stop(MediaKind::Tv).unwrap();
        let status = h.controller.status(MediaKind::Tv);
        assert!(status.in_progress);
        assert!(status.stop_requested);
        // A second request while stopping is accepted
        h.controller.request_stop(MediaKind::Tv).unwrap();

        h.metadata.open_gate();
        let status = h.wait_idle(MediaKind::Tv).await;

        assert_eq!(status.status_message, "Scan stopped by user after 1 of 3 items");
        assert!(!status.stop_requested);
        assert_eq!(h.count("shows").await, 1);
    }

    #[tokio::test]
    async fn test_stop_when_idle() {
        let h = Harness::new().await;
        assert_matches!(
            h.controller.request_stop(MediaKind::Movie),
            Err(ScanError::NotRunning(MediaKind::Movie))
        );
    }

    #[tokio::test]
    async fn test_rematch_show() {
        let h = Harness::new().await;
        h.metadata.add_show(1, "Wrong", "Ended", &[&[(1, PAST)]]);
        h.metadata.add_show(2, "Right", "Returning Series", &[&[(1, PAST), (2, FUTURE)]]);
        h.library.set(MediaKind::Tv, vec![show_item("Show", Some(1), &[(1, 1)])]);
        h.run(MediaKind::Tv).await;
        assert_eq!(
            h.db.shows().get_by_title("Show").await.unwrap().unwrap().series_status,
            "Complete - Ended"
        );

        let diff = h.controller.rematch_show("Show", 2).await.unwrap();
        assert_eq!(diff.future_missing, vec![EpisodeKey::new(1, 2)]);
        assert_eq!(diff.display_status, "Complete - Upcoming");

        let show = h.db.shows().get_by_title("Show").await.unwrap().unwrap();
        assert_eq!(show.tmdb_id, Some(2));
        assert_eq!(show.series_status, "Complete - Upcoming");
    }

    #[tokio::test]
    async fn test_rematch_unknown_title() {
        let h = Harness::new().await;
        assert_matches!(
            h.controller.rematch_show("Nope", 1).await,
            Err(ScanError::ShowNotFound(title)) if title == "Nope"
        );
    }

    #[tokio::test]
    async fn test_rematch_rejected_during_tv_scan() {
        let h = Harness::with_metadata(FakeMetadata::gated()).await;
        h.metadata.add_show(1, "Held", "Ended", &[&[(1, PAST)]]);
        h.library.set(MediaKind::Tv, vec![show_item("Held", Some(1), &[])]);

        h.controller.start(MediaKind::Tv).unwrap();
        assert_matches!(
            h.controller.rematch_show("Held", 1).await,
            Err(ScanError::AlreadyRunning(MediaKind::Tv))
        );

        h.metadata.open_gate();
        h.wait_idle(MediaKind::Tv).await;
    }

    #[tokio::test]
    async fn test_tv_start_rejected_during_rematch() {
        let h = Harness::with_metadata(FakeMetadata::gated()).await;
        h.metadata.add_show(1, "Held", "Ended", &[&[(1, PAST)]]);
        h.library.set(MediaKind::Tv, vec![show_item("Held", None, &[(1, 1)])]);

        let controller = h.controller.clone();
        let rematch = tokio::spawn(async move { controller.rematch_show("Held", 1).await });
        h.metadata.wait_for_blocked_fetch().await;

        assert_matches!(
            h.controller.start(MediaKind::Tv),
            Err(ScanError::AlreadyRunning(MediaKind::Tv))
        );
        assert!(!h.controller.status(MediaKind::Tv).in_progress);

        h.metadata.open_gate();
        let diff = rematch.await.unwrap().unwrap();
        assert_eq!(diff.display_status, "Complete - Ended");

        h.run(MediaKind::Tv).await;
    }
}

// ============================================================================
// Movie pass
// ============================================================================

mod movies {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn missing_ids(h: &Harness, collection: &str) -> Vec<i64> {
        h.db.movies()
            .list_collections()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.collection.tmdb_id == collection)
            .map(|c| c.missing.into_iter().map(|m| m.tmdb_id).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_collection_fetched_once_per_pass() {
        let h = Harness::new().await;
        h.metadata.add_collection(10, "Trilogy", &[(1, "Part 1"), (2, "Part 2"), (3, "Part 3")]);
        h.metadata.add_movie(1, "Part 1", Some((10, "Trilogy")));
        h.metadata.add_movie(2, "Part 2", Some((10, "Trilogy")));
        h.library.set(
            MediaKind::Movie,
            vec![movie_item("Part 1", Some(1)), movie_item("Part 2", Some(2))],
        );

        let status = h.run(MediaKind::Movie).await;
        assert_eq!(status.processed, 2);

        assert_eq!(h.metadata.collection_calls.load(Ordering::SeqCst), 1);
        assert_eq!(missing_ids(&h, "10").await, vec![3]);
    }

    #[tokio::test]
    async fn test_standalone_movie_gets_singleton_collection() {
        let h = Harness::new().await;
        h.metadata.add_movie(42, "Loner", None);
        h.library.set(MediaKind::Movie, vec![movie_item("Loner", Some(42))]);

        h.run(MediaKind::Movie).await;

        let collections = h.db.movies().list_collections().await.unwrap();
        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0].collection.tmdb_id, "standalone-42");
        assert_eq!(collections[0].collection.name, "Loner");
        assert!(collections[0].missing.is_empty());
        assert_eq!(h.metadata.collection_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_member_owned_later_in_pass_is_not_missing() {
        let h = Harness::new().await;
        h.metadata.add_collection(10, "Trilogy", &[(1, "Part 1"), (2, "Part 2"), (3, "Part 3")]);
        h.metadata.add_movie(1, "Part 1", Some((10, "Trilogy")));
        h.metadata.add_movie(3, "Part 3", Some((10, "Trilogy")));
        h.metadata.add_search("Part 3", 3);
        h.library.set(
            MediaKind::Movie,
            vec![movie_item("Part 1", Some(1)), movie_item("Part 3", None)],
        );

        h.run(MediaKind::Movie).await;

        assert_eq!(missing_ids(&h, "10").await, vec![2]);
    }

    #[tokio::test]
    async fn test_unresolvable_movie_is_skipped() {
        let h = Harness::new().await;
        h.library.set(MediaKind::Movie, vec![movie_item("Home Video", None)]);

        let status = h.run(MediaKind::Movie).await;

        assert_eq!(status.status_message, "Scan complete: 1 of 1 items");
        assert_eq!(h.count("movies").await, 0);
    }

    #[tokio::test]
    async fn test_removed_movie_is_purged() {
        let h = Harness::new().await;
        h.metadata.add_movie(42, "Loner", None);
        h.metadata.add_collection(10, "Trilogy", &[(1, "Part 1"), (2, "Part 2")]);
        h.metadata.add_movie(1, "Part 1", Some((10, "Trilogy")));
        h.library.set(
            MediaKind::Movie,
            vec![movie_item("Loner", Some(42)), movie_item("Part 1", Some(1))],
        );
        h.run(MediaKind::Movie).await;
        assert_eq!(h.count("collections").await, 2);

        h.library.set(MediaKind::Movie, vec![]);
        h.run(MediaKind::Movie).await;

        assert_eq!(h.count("movies").await, 0);
        assert_eq!(h.count("collections").await, 0);
        assert_eq!(h.count("missing_movies").await, 0);
    }

    #[tokio::test]
    async fn test_movie_passes_are_idempotent() {
        let h = Harness::new().await;
        h.metadata.add_collection(10, "Trilogy", &[(1, "Part 1"), (2, "Part 2"), (3, "Part 3")]);
        h.metadata.add_movie(1, "Part 1", Some((10, "Trilogy")));
        h.library.set(MediaKind::Movie, vec![movie_item("Part 1", Some(1))]);

        h.run(MediaKind::Movie).await;
        let first = (
            h.count("movies").await,
            h.count("collections").await,
            missing_ids(&h, "10").await,
        );
        h.run(MediaKind::Movie).await;
        let second = (
            h.count("movies").await,
            h.count("collections").await,
            missing_ids(&h, "10").await,
        );

        assert_eq!(first, second);
        assert_eq!(first.2, vec![2, 3]);
    }
}
