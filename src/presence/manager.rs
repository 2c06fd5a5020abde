//! Fans presence updates out to every connected backend and drives the polling loop

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::status::{classify, PresenceStatus};
use super::traits::PresenceProvider;
use crate::error::{HostError, PresenceError};
use crate::sampler::Sampler;

/// Outcome of opening one backend at startup
pub type BackendConnection = (&'static str, Result<Box<dyn PresenceProvider>, PresenceError>);

/// Owns the connected backends and the session start of the current run
pub struct PresenceManager {
    providers: Vec<Box<dyn PresenceProvider>>,
    session_start: DateTime<Utc>,
}

impl PresenceManager {
    pub fn new(session_start: DateTime<Utc>) -> Self {
        Self {
            providers: Vec::new(),
            session_start,
        }
    }

    /// Add a presence provider
    pub fn add_provider(&mut self, provider: Box<dyn PresenceProvider>) {
        tracing::info!("Adding presence provider: {}", provider.name());
        self.providers.push(provider);
    }

    /// Adopt a backend if it connected; a failed one stays out for the whole session
    pub fn add_connection(&mut self, connection: BackendConnection) {
        match connection {
            (_, Ok(provider)) => self.add_provider(provider),
            (backend, Err(e)) => {
                tracing::warn!("{} presence unavailable, skipping it: {}", backend, e);
            }
        }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Update presence on all providers, returning how many accepted it
    pub fn publish(&mut self, status: &PresenceStatus) -> usize {
        tracing::debug!("Updating presence: {}", status.headline);
        let mut delivered = 0;
        for provider in &mut self.providers {
            match provider.update_presence(status) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!("Failed to update {} presence: {}", provider.name(), e),
            }
        }
        delivered
    }

    /// Clear presence on all providers
    pub fn clear_all_presence(&mut self) {
        for provider in &mut self.providers {
            if let Err(e) = provider.clear_presence() {
                tracing::warn!("Failed to clear {} presence: {}", provider.name(), e);
            }
        }
    }

    /// Sample, classify and publish once.
    ///
    /// Returns `None` without publishing while the game is still loading.
    pub fn tick(&mut self, sampler: &Sampler) -> Result<Option<PresenceStatus>, HostError> {
        for provider in &mut self.providers {
            provider.poll();
        }

        let snapshot = sampler.sample()?;
        if snapshot.is_empty() {
            tracing::debug!("Game not initialized yet, skipping presence update");
            return Ok(None);
        }

        let status = classify(&snapshot, self.session_start);
        self.publish(&status);
        Ok(Some(status))
    }

    /// Clear every backend and release its connection
    pub async fn shutdown(mut self) {
        self.clear_all_presence();
        for provider in self.providers {
            let name = provider.name();
            provider.shutdown().await;
            tracing::info!("{} presence shut down", name);
        }
    }
}

/// Run one tick, logging instead of propagating any failure or panic
fn run_tick(manager: &mut PresenceManager, sampler: &Sampler) {
    match panic::catch_unwind(AssertUnwindSafe(|| manager.tick(sampler))) {
        Ok(Ok(Some(status))) => tracing::trace!("Presence is now {:?}", status.headline),
        Ok(Ok(None)) => {}
        Ok(Err(e)) => tracing::error!("Presence update failed: {}", e),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("Presence update panicked: {}", message);
        }
    }
}

/// Start the background task that samples the game and updates presence.
///
/// The first tick runs immediately, then one every `interval`. Once `cancel`
/// fires the loop stops scheduling ticks and hands the manager back.
pub fn start_presence_background_task(
    mut manager: PresenceManager,
    sampler: Sampler,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<PresenceManager> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            run_tick(&mut manager, &sampler);
        }

        tracing::debug!("Presence polling stopped");
        manager
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::host::{GameWorld, PlayerData, CURRENT_MAP_ZONE};
    use crate::sampler::Entity;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records everything it is asked to do
    #[derive(Clone, Default)]
    pub(crate) struct Recorder {
        pub headlines: Arc<Mutex<Vec<String>>>,
        pub clears: Arc<AtomicUsize>,
        pub shutdowns: Arc<AtomicUsize>,
    }

    pub(crate) struct RecordingProvider {
        pub name: &'static str,
        pub recorder: Recorder,
    }

    #[async_trait]
    impl PresenceProvider for RecordingProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn update_presence(&mut self, status: &PresenceStatus) -> Result<(), PresenceError> {
            self.recorder
                .headlines
                .lock()
                .unwrap()
                .push(status.headline.clone());
            Ok(())
        }

        fn clear_presence(&mut self) -> Result<(), PresenceError> {
            self.recorder.clears.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn shutdown(self: Box<Self>) {
            self.recorder.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct BrokenProvider;

    #[async_trait]
    impl PresenceProvider for BrokenProvider {
        fn name(&self) -> &'static str {
            "Discord"
        }

        fn update_presence(&mut self, _status: &PresenceStatus) -> Result<(), PresenceError> {
            Err(PresenceError::Disconnected("Discord"))
        }

        fn clear_presence(&mut self) -> Result<(), PresenceError> {
            Err(PresenceError::Disconnected("Discord"))
        }

        async fn shutdown(self: Box<Self>) {}
    }

    enum Fault {
        None,
        ErrorOnFirst,
        PanicOnFirst,
    }

    /// A game sitting in Greenpath whose first read can be made to fail
    pub(crate) struct FlakyGame {
        calls: AtomicUsize,
        fault: Fault,
    }

    impl FlakyGame {
        pub(crate) fn healthy() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fault: Fault::None,
            }
        }

        fn failing_first() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fault: Fault::ErrorOnFirst,
            }
        }

        fn panicking_first() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fault: Fault::PanicOnFirst,
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl GameWorld for FlakyGame {
        fn active_scene(&self) -> Result<String, HostError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match (&self.fault, call) {
                (Fault::ErrorOnFirst, 0) => Err(HostError::Io {
                    path: "scene".into(),
                    source: std::io::Error::other("scene manager unavailable"),
                }),
                (Fault::PanicOnFirst, 0) => panic!("scene manager exploded"),
                _ => Ok("Fungus1_01".to_string()),
            }
        }

        fn active_entities(&self) -> Result<Vec<Entity>, HostError> {
            Ok(Vec::new())
        }
    }

    impl PlayerData for FlakyGame {
        fn get_string(&self, key: &str) -> Result<Option<String>, HostError> {
            Ok((key == CURRENT_MAP_ZONE).then(|| "Greenpath".to_string()))
        }

        fn get_bool(&self, _key: &str) -> Result<Option<bool>, HostError> {
            Ok(Some(false))
        }
    }

    pub(crate) fn sampler_for(game: &Arc<FlakyGame>) -> Sampler {
        Sampler::new(game.clone(), game.clone())
    }

    fn recording(name: &'static str) -> (Box<dyn PresenceProvider>, Recorder) {
        let recorder = Recorder::default();
        let provider = RecordingProvider {
            name,
            recorder: recorder.clone(),
        };
        (Box::new(provider), recorder)
    }

    #[test]
    fn failed_connection_does_not_block_other_backend() {
        let mut manager = PresenceManager::new(Utc::now());
        let (steam, recorder) = recording("Steam");

        manager.add_connection(("Discord", Err(PresenceError::HandshakeTimeout)));
        manager.add_connection(("Steam", Ok(steam)));
        assert_eq!(manager.provider_names(), vec!["Steam"]);

        let game = Arc::new(FlakyGame::healthy());
        manager.tick(&sampler_for(&game)).unwrap();
        manager.tick(&sampler_for(&game)).unwrap();

        assert_eq!(
            *recorder.headlines.lock().unwrap(),
            vec!["Exploring Greenpath", "Exploring Greenpath"]
        );
    }

    #[test]
    fn failing_backend_does_not_suppress_the_other() {
        let mut manager = PresenceManager::new(Utc::now());
        let (steam, recorder) = recording("Steam");
        manager.add_provider(Box::new(BrokenProvider));
        manager.add_provider(steam);

        let game = Arc::new(FlakyGame::healthy());
        let status = manager.tick(&sampler_for(&game)).unwrap().unwrap();

        assert_eq!(manager.publish(&status), 1);
        assert_eq!(recorder.headlines.lock().unwrap().len(), 2);
    }

    #[test]
    fn empty_snapshot_is_not_published() {
        struct Loading;

        impl GameWorld for Loading {
            fn active_scene(&self) -> Result<String, HostError> {
                Err(HostError::NotReady)
            }

            fn active_entities(&self) -> Result<Vec<Entity>, HostError> {
                Err(HostError::NotReady)
            }
        }

        impl PlayerData for Loading {
            fn get_string(&self, _key: &str) -> Result<Option<String>, HostError> {
                Err(HostError::NotReady)
            }

            fn get_bool(&self, _key: &str) -> Result<Option<bool>, HostError> {
                Err(HostError::NotReady)
            }
        }

        let mut manager = PresenceManager::new(Utc::now());
        let (provider, recorder) = recording("Discord");
        manager.add_provider(provider);

        let loading = Arc::new(Loading);
        let sampler = Sampler::new(loading.clone(), loading);

        assert!(manager.tick(&sampler).unwrap().is_none());
        assert!(recorder.headlines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn shutdown_clears_and_releases_every_backend() {
        let mut manager = PresenceManager::new(Utc::now());
        let (discord, discord_rec) = recording("Discord");
        let (steam, steam_rec) = recording("Steam");
        manager.add_provider(discord);
        manager.add_provider(steam);

        manager.shutdown().await;

        for recorder in [discord_rec, steam_rec] {
            assert_eq!(recorder.clears.load(Ordering::SeqCst), 1);
            assert_eq!(recorder.shutdowns.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sampling_error_does_not_stop_the_loop() {
        let game = Arc::new(FlakyGame::failing_first());
        let (provider, recorder) = recording("Steam");
        let mut manager = PresenceManager::new(Utc::now());
        manager.add_provider(provider);

        let cancel = CancellationToken::new();
        let handle = start_presence_background_task(
            manager,
            sampler_for(&game),
            Duration::from_secs(8),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(game.calls(), 1);
        assert!(recorder.headlines.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(8)).await;
        assert_eq!(game.calls(), 2);
        assert_eq!(
            *recorder.headlines.lock().unwrap(),
            vec!["Exploring Greenpath"]
        );

        cancel.cancel();
        let manager = handle.await.unwrap();
        assert_eq!(manager.provider_names(), vec!["Steam"]);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_tick_does_not_stop_the_loop() {
        let game = Arc::new(FlakyGame::panicking_first());
        let (provider, recorder) = recording("Steam");
        let mut manager = PresenceManager::new(Utc::now());
        manager.add_provider(provider);

        let cancel = CancellationToken::new();
        let handle = start_presence_background_task(
            manager,
            sampler_for(&game),
            Duration::from_secs(8),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(game.calls(), 2);
        assert_eq!(recorder.headlines.lock().unwrap().len(), 1);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_loop_schedules_no_more_ticks() {
        let game = Arc::new(FlakyGame::healthy());
        let cancel = CancellationToken::new();
        let handle = start_presence_background_task(
            PresenceManager::new(Utc::now()),
            sampler_for(&game),
            Duration::from_secs(8),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(game.calls(), 1);
    }
}
