//! ISRC deduplication.
//!
//! Tracks that share an ISRC but were created under different (title,
//! artist, album) identities are collapsed into one survivor after every
//! sync cycle. The survivor takes over the losers' source tracks and
//! playlist entries, absorbs their metadata, and the losers are deleted.

use crate::error::Result;
use crate::reconcile::MergePolicy;
use core_library::{LibrarySession, Track, TrackId};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, instrument};

/// Outcome of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupReport {
    /// ISRC groups with more than one track
    pub groups: u64,
    /// Tracks deleted after merging into a survivor
    pub merged: u64,
}

/// Post-sync ISRC merge.
#[derive(Debug, Clone, Copy, Default)]
pub struct DedupPass {
    policy: MergePolicy,
}

impl DedupPass {
    pub fn new(policy: MergePolicy) -> Self {
        Self { policy }
    }

    /// Runs over the full track set and commits the session.
    #[instrument(skip(self, session))]
    pub async fn run(&self, session: &mut dyn LibrarySession) -> Result<DedupReport> {
        let tracks = session.fetch_tracks().await?;
        let primary_tracks: HashSet<TrackId> = session
            .fetch_source_tracks(Some(self.policy.primary))
            .await?
            .into_iter()
            .map(|s| s.track_id)
            .collect();

        let mut report = DedupReport::default();
        for group in group_by_isrc(tracks) {
            report.groups += 1;

            let survivor_pos = group
                .iter()
                .position(|t| primary_tracks.contains(&t.id))
                .unwrap_or(0);
            let survivor = &group[survivor_pos];
            let merged = self.merge_group(survivor, &group, &primary_tracks);

            for loser in group.iter().filter(|t| t.id != survivor.id) {
                let moved = session.reassign_track(loser.id, survivor.id).await?;
                session.delete_track(loser.id).await?;
                report.merged += 1;
                debug!(
                    survivor = %survivor.id,
                    duplicate = %loser.id,
                    moved,
                    "Merged duplicate track"
                );
            }

            if !merged.same_content(survivor) {
                session.update_track(&merged).await?;
            }
        }

        session.save().await?;

        if report.merged > 0 {
            info!(
                groups = report.groups,
                merged = report.merged,
                "Deduplicated tracks by ISRC"
            );
        }
        Ok(report)
    }

    fn merge_group(
        &self,
        survivor: &Track,
        group: &[Track],
        primary_tracks: &HashSet<TrackId>,
    ) -> Track {
        let mut merged = survivor.clone();

        // Survivor first, then the rest in snapshot order.
        let ordered: Vec<&Track> = std::iter::once(survivor)
            .chain(group.iter().filter(|t| t.id != survivor.id))
            .collect();

        let is_primary_artwork = |t: &Track| {
            t.artwork_url.is_some()
                && match t.artwork_provider {
                    Some(provider) => provider == self.policy.primary,
                    None => primary_tracks.contains(&t.id),
                }
        };
        let artwork_from = ordered
            .iter()
            .copied()
            .find(|t| is_primary_artwork(*t))
            .or_else(|| ordered.iter().copied().find(|t| t.artwork_url.is_some()));
        if let Some(source) = artwork_from {
            merged.artwork_url = source.artwork_url.clone();
            merged.artwork_provider = source.artwork_provider;
        }

        merged.added_at = ordered.iter().filter_map(|t| t.added_at).min();

        let genres: BTreeSet<String> = ordered
            .iter()
            .flat_map(|t| t.genres.iter().cloned())
            .collect();
        merged.genres = genres.into_iter().collect();

        merged.album_artist = ordered.iter().find_map(|t| t.album_artist.clone());
        merged.composer = ordered.iter().find_map(|t| t.composer.clone());
        merged.release_date = ordered.iter().find_map(|t| t.release_date.clone());

        merged
    }
}

/// Groups with a non-empty ISRC and at least two members, in snapshot order.
fn group_by_isrc(tracks: Vec<Track>) -> Vec<Vec<Track>> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<Track>> = Vec::new();

    for track in tracks {
        let Some(isrc) = track.normalized_isrc() else {
            continue;
        };
        match positions.get(&isrc) {
            Some(&pos) => groups[pos].push(track),
            None => {
                positions.insert(isrc, groups.len());
                groups.push(vec![track]);
            }
        }
    }

    groups.retain(|g| g.len() > 1);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_auth::ProviderKind;
    use core_library::{
        create_test_pool, LibraryStore, SourceTrack, SourceTrackId, SqliteLibraryStore,
    };

    fn track(title: &str, isrc: Option<&str>) -> Track {
        Track {
            id: TrackId::new(),
            title: title.to_string(),
            artist_name: "Artist".to_string(),
            album_name: "Album".to_string(),
            album_artist: None,
            artwork_url: None,
            artwork_provider: None,
            duration_ms: 1000,
            genres: Vec::new(),
            release_date: None,
            explicit: false,
            isrc: isrc.map(str::to_string),
            disc_number: None,
            track_number: None,
            composer: None,
            added_at: None,
            last_synced_at: 0,
        }
    }

    fn source(track_id: TrackId, provider: ProviderKind, item: &str) -> SourceTrack {
        SourceTrack {
            id: SourceTrackId::new(),
            track_id,
            provider,
            provider_item_id: item.to_string(),
            in_library: true,
            added_at: None,
            play_count: None,
            last_played_at: None,
            rating: None,
            popularity: None,
            preview_url: None,
            artwork_url: None,
            last_synced_at: 0,
        }
    }

    #[test]
    fn test_grouping_ignores_blank_and_single_isrcs() {
        let groups = group_by_isrc(vec![
            track("a", Some("X1")),
            track("b", Some(" x1 ")),
            track("c", Some("Y2")),
            track("d", Some("  ")),
            track("e", None),
        ]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0][0].title, "a");
    }

    #[test]
    fn test_merge_group_unions_metadata() {
        let pass = DedupPass::default();
        let mut survivor = track("a", Some("X1"));
        survivor.genres = vec!["Rock".to_string()];
        survivor.added_at = Some(300);

        let mut other = track("b", Some("X1"));
        other.genres = vec!["Alternative".to_string(), "Rock".to_string()];
        other.added_at = Some(100);
        other.composer = Some("Writer".to_string());
        other.artwork_url = Some("remote://art".to_string());
        other.artwork_provider = Some(ProviderKind::RemoteApi);

        let merged = pass.merge_group(&survivor, &[survivor.clone(), other], &HashSet::new());
        assert_eq!(merged.genres, vec!["Alternative", "Rock"]);
        assert_eq!(merged.added_at, Some(100));
        assert_eq!(merged.composer.as_deref(), Some("Writer"));
        assert_eq!(merged.artwork_url.as_deref(), Some("remote://art"));
    }

    #[core_async::test]
    async fn test_primary_sourced_track_survives() {
        let store = SqliteLibraryStore::new(create_test_pool().await.unwrap());
        let mut session = store.open_session().await.unwrap();

        let remote = track("Song (Remastered)", Some("USRC12345678"));
        let mut local = track("Song", Some("usrc12345678"));
        local.artwork_url = Some("local://art".to_string());
        local.artwork_provider = Some(ProviderKind::LocalLibrary);
        session.insert_track(&remote).await.unwrap();
        session.insert_track(&local).await.unwrap();
        session
            .insert_source_track(&source(remote.id, ProviderKind::RemoteApi, "r1"))
            .await
            .unwrap();
        session
            .insert_source_track(&source(local.id, ProviderKind::LocalLibrary, "l1"))
            .await
            .unwrap();
        session.save().await.unwrap();

        let pass = DedupPass::default();
        let report = pass.run(&mut *session).await.unwrap();
        assert_eq!(report, DedupReport { groups: 1, merged: 1 });

        let tracks = session.fetch_tracks().await.unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, local.id);
        assert!(session
            .fetch_source_tracks(None)
            .await
            .unwrap()
            .iter()
            .all(|s| s.track_id == local.id));

        let again = pass.run(&mut *session).await.unwrap();
        assert_eq!(again.merged, 0);
    }
}
