//! Profile Evolution.
//!
//! Derives and persists a behavioural [`Profile`] per author from every
//! ingested [`Event`].
//!
//! ## Update rule
//!
//! For each event:
//!
//! 1. Load the cached profile, else the stored one, else a fresh default.
//! 2. Increment the interaction count, refresh last-seen and display name.
//! 3. Attachments add the media interest tag (once).
//! 4. Positive sentiment raises friendliness, negative raises aggression,
//!    humour markers raise humour; each by [`TRAIT_DELTA`].
//! 5. Recompute the relationship tier from the new count.
//! 6. Persist, then publish to the cache.
//!
//! Steps 1–6 run under a per-author lock, so updates for different authors
//! proceed concurrently while two events from the same author serialise.
//! [`ProfileEvolution::update`] is not idempotent: the caller must invoke it
//! exactly once per event.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use banter_memory::{MessageStore, StoreError};
use banter_types::{AuthorId, Event, MEDIA_INTEREST_TAG, Profile, RelationshipTier, Sentiment, Trait};
use tracing::{debug, info};

use crate::scoring::has_humor_marker;

/// Fixed increment applied to a trait per triggering event.
pub const TRAIT_DELTA: f64 = 0.1;

type Slot = Arc<Mutex<Option<Profile>>>;

/// Owner of every author profile.
pub struct ProfileEvolution {
    store: Arc<MessageStore>,
    slots: Mutex<HashMap<AuthorId, Slot>>,
}

impl ProfileEvolution {
    pub fn new(store: Arc<MessageStore>) -> Self {
        Self {
            store,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<AuthorId, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn slot(&self, author_id: AuthorId) -> Slot {
        Arc::clone(self.slots().entry(author_id).or_default())
    }

    /// Populate the cache with every decodable stored profile.
    pub fn warm(&self) -> Result<usize, StoreError> {
        let profiles = self.store.load_profiles()?;
        let loaded = profiles.len();
        let mut slots = self.slots();
        for profile in profiles {
            slots.insert(profile.author_id, Arc::new(Mutex::new(Some(profile))));
        }
        info!(loaded, "profiles loaded");
        Ok(loaded)
    }

    /// Apply `event` to its author's profile and persist the result.
    ///
    /// The cache is only updated after the store accepted the write, so a
    /// failed persist leaves the previous snapshot in place.
    pub fn update(&self, event: &Event) -> Result<Profile, StoreError> {
        let slot = self.slot(event.author_id);
        let mut current = slot.lock().unwrap_or_else(|e| e.into_inner());

        let base = match current.as_ref() {
            Some(p) => p.clone(),
            None => self
                .store
                .profile_get(event.author_id)?
                .unwrap_or_else(|| Profile::new(event.author_id, event.display_name.clone(), event.timestamp)),
        };
        let next = evolve(base, event);
        self.store.profile_put(&next)?;
        debug!(
            author_id = next.author_id,
            count = next.interaction_count,
            tier = %next.tier,
            "profile updated"
        );
        *current = Some(next.clone());
        Ok(next)
    }

    /// Current profile of `author_id`, consulting the store on a cache miss.
    pub fn get(&self, author_id: AuthorId) -> Result<Option<Profile>, StoreError> {
        let slot = self.slot(author_id);
        let mut current = slot.lock().unwrap_or_else(|e| e.into_inner());
        if current.is_none() {
            *current = self.store.profile_get(author_id)?;
        }
        Ok(current.clone())
    }

    /// Every cached profile, in unspecified order.
    pub fn snapshot(&self) -> Vec<Profile> {
        let slots: Vec<Slot> = self.slots().values().cloned().collect();
        slots
            .iter()
            .filter_map(|s| s.lock().unwrap_or_else(|e| e.into_inner()).clone())
            .collect()
    }
}

/// Pure update step: `profile` after observing `event`.
pub fn evolve(mut profile: Profile, event: &Event) -> Profile {
    profile.interaction_count += 1;
    profile.last_seen = event.timestamp;
    profile.display_name = event.display_name.clone();

    if event.has_attachment && !profile.interests.iter().any(|i| i == MEDIA_INTEREST_TAG) {
        profile.interests.push(MEDIA_INTEREST_TAG.to_string());
    }

    match event.sentiment {
        Sentiment::Positive => bump(&mut profile, Trait::Friendliness),
        Sentiment::Negative => bump(&mut profile, Trait::Aggression),
        Sentiment::Neutral => {}
    }
    if has_humor_marker(&event.text) {
        bump(&mut profile, Trait::Humor);
    }

    profile.tier = RelationshipTier::from_interactions(profile.interaction_count);
    profile
}

fn bump(profile: &mut Profile, t: Trait) {
    let value = profile.traits.entry(t).or_insert(banter_types::INITIAL_TRAIT_INTENSITY);
    *value = (*value + TRAIT_DELTA).max(0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use banter_types::{INITIAL_TRAIT_INTENSITY, InboundMessage};

    fn event(author: AuthorId, text: &str, sentiment: Sentiment) -> Event {
        Event::from_inbound(&InboundMessage::new(author, "Вася", text), sentiment, 0.5)
    }

    fn evolution() -> ProfileEvolution {
        ProfileEvolution::new(Arc::new(MessageStore::open_in_memory().unwrap()))
    }

    #[test]
    fn first_event_creates_profile() {
        let profiles = evolution();
        let p = profiles.update(&event(1, "привет", Sentiment::Neutral)).unwrap();
        assert_eq!(p.interaction_count, 1);
        assert_eq!(p.tier, RelationshipTier::Stranger);
        assert!((p.trait_value(Trait::Friendliness) - INITIAL_TRAIT_INTENSITY).abs() < 1e-9);
    }

    #[test]
    fn positive_events_raise_friendliness() {
        let profiles = evolution();
        profiles.update(&event(1, "круто", Sentiment::Positive)).unwrap();
        let p = profiles.update(&event(1, "круто", Sentiment::Positive)).unwrap();
        assert!((p.trait_value(Trait::Friendliness) - (INITIAL_TRAIT_INTENSITY + 0.2)).abs() < 1e-9);
        assert!((p.trait_value(Trait::Aggression) - INITIAL_TRAIT_INTENSITY).abs() < 1e-9);
        assert_eq!(p.interaction_count, 2);
    }

    #[test]
    fn negative_and_humor_adjust_their_traits() {
        let p = evolve(Profile::new(1, "a", chrono::Utc::now()), &event(1, "лол это бред", Sentiment::Negative));
        assert!((p.trait_value(Trait::Aggression) - 0.6).abs() < 1e-9);
        assert!((p.trait_value(Trait::Humor) - 0.6).abs() < 1e-9);
        assert!((p.trait_value(Trait::Friendliness) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn attachment_adds_media_interest_once() {
        let inbound = InboundMessage::new(1, "a", "мем").with_attachment(None);
        let e = Event::from_inbound(&inbound, Sentiment::Neutral, 0.8);
        let p = evolve(Profile::new(1, "a", chrono::Utc::now()), &e);
        let p = evolve(p, &e);
        assert_eq!(p.interests, vec![MEDIA_INTEREST_TAG.to_string()]);
    }

    #[test]
    fn tier_follows_count() {
        let mut p = Profile::new(1, "a", chrono::Utc::now());
        let e = event(1, "ok", Sentiment::Neutral);
        for _ in 0..6 {
            p = evolve(p, &e);
        }
        assert_eq!(p.tier, RelationshipTier::Acquaintance);
        for _ in 0..15 {
            p = evolve(p, &e);
        }
        assert_eq!(p.interaction_count, 21);
        assert_eq!(p.tier, RelationshipTier::Friend);
    }

    #[test]
    fn display_name_tracks_latest_event() {
        let profiles = evolution();
        profiles.update(&event(1, "a", Sentiment::Neutral)).unwrap();
        let renamed = Event::from_inbound(&InboundMessage::new(1, "Василий", "b"), Sentiment::Neutral, 0.5);
        let p = profiles.update(&renamed).unwrap();
        assert_eq!(p.display_name, "Василий");
    }

    #[test]
    fn update_persists_to_store() {
        let store = Arc::new(MessageStore::open_in_memory().unwrap());
        let profiles = ProfileEvolution::new(Arc::clone(&store));
        profiles.update(&event(3, "спасибо", Sentiment::Positive)).unwrap();

        let stored = store.profile_get(3).unwrap().unwrap();
        assert_eq!(stored.interaction_count, 1);

        // A fresh evolution over the same store continues from the snapshot.
        let reopened = ProfileEvolution::new(store);
        let p = reopened.update(&event(3, "ещё", Sentiment::Neutral)).unwrap();
        assert_eq!(p.interaction_count, 2);
    }

    #[test]
    fn get_falls_back_to_store_and_warm_loads_all() {
        let store = Arc::new(MessageStore::open_in_memory().unwrap());
        store.profile_put(&Profile::new(8, "b", chrono::Utc::now())).unwrap();
        store.profile_put(&Profile::new(9, "c", chrono::Utc::now())).unwrap();

        let profiles = ProfileEvolution::new(Arc::clone(&store));
        assert!(profiles.get(8).unwrap().is_some());
        assert!(profiles.get(404).unwrap().is_none());

        let fresh = ProfileEvolution::new(store);
        assert_eq!(fresh.warm().unwrap(), 2);
        assert_eq!(fresh.snapshot().len(), 2);
    }

    #[test]
    fn concurrent_updates_for_one_author_are_not_lost() {
        let profiles = Arc::new(evolution());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let profiles = Arc::clone(&profiles);
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        profiles.update(&event(1, "ok", Sentiment::Neutral)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(profiles.get(1).unwrap().unwrap().interaction_count, 40);
    }
}
