use std::sync::Arc;

use time::Duration;

use super::jwt::{Claims, Keys};
use crate::{
    models::players::Player,
    store::{memory::MemoryStore, ConnectionStore},
    AppState,
};

const TEST_SECRET: &[u8] = b"aegis-test-secret";

pub fn test_state(store: Arc<MemoryStore>) -> AppState {
    state_with_store(store)
}

pub fn state_with_store(store: Arc<dyn ConnectionStore>) -> AppState {
    AppState {
        store,
        jwt_keys: Keys::new(TEST_SECRET),
    }
}

pub fn token_for(player: &Player) -> String {
    Claims::for_player(player, Duration::hours(1))
        .encode(&Keys::new(TEST_SECRET))
        .unwrap()
}
