/// Sequence-coordinated identifier minting
///
/// One minter exists per machine tag and is shared by every task in the
/// process. The (millisecond, sequence) pair lives behind a single mutex,
/// so at most one caller mints at a time and no two identifiers from the
/// same process repeat a pair while the per-millisecond sequence stays in
/// bounds.
use crate::error::{WaypointError, WaypointResult};
use crate::idgen::codec::{EntityId, MAX_SEQUENCE};
use crate::idgen::machine::MachineTag;
use chrono::Utc;
use std::sync::Mutex;
use std::time::Duration;

/// Minting state: the last observed millisecond and the sequence handed
/// out within it.
struct MintState {
    last_ms: i64,
    sequence: u32,
}

/// Identifier minter for one machine tag
pub struct IdMinter {
    machine_tag: MachineTag,
    max_wait: Duration,
    state: Mutex<MintState>,
}

impl IdMinter {
    /// Create a minter with the configured exhaustion wait
    pub fn new(machine_tag: MachineTag, max_wait: Duration) -> Self {
        Self {
            machine_tag,
            max_wait,
            state: Mutex::new(MintState {
                last_ms: 0,
                sequence: 0,
            }),
        }
    }

    /// The machine tag every identifier from this minter carries
    pub fn machine_tag(&self) -> MachineTag {
        self.machine_tag
    }

    /// Mint the next identifier using the configured exhaustion wait
    pub async fn mint(&self) -> WaypointResult<EntityId> {
        self.next(self.max_wait).await
    }

    /// Mint the next identifier.
    ///
    /// When the per-millisecond sequence is exhausted the caller sleeps
    /// `max_wait` with the lock released, then proceeds; the bound is not
    /// re-checked after the wait (a clock advance resets the sequence
    /// below). A zero `max_wait` during exhaustion fails with
    /// [`WaypointError::MintExhausted`]; callers may retry.
    pub async fn next(&self, max_wait: Duration) -> WaypointResult<EntityId> {
        let exhausted = {
            let state = self.lock_state()?;
            state.sequence >= MAX_SEQUENCE
        };

        if exhausted {
            if max_wait.is_zero() {
                return Err(WaypointError::MintExhausted(
                    "per-millisecond sequence exhausted and no wait allowed".to_string(),
                ));
            }
            tokio::time::sleep(max_wait).await;
        }

        let mut state = self.lock_state()?;
        let now = Utc::now().timestamp_millis();
        if now != state.last_ms {
            state.last_ms = now;
            state.sequence = 0;
        }
        state.sequence += 1;

        let sequence = (state.sequence & 0xFFFF) as u16;
        EntityId::from_parts(now, self.machine_tag.value(), sequence)
    }

    fn lock_state(&self) -> WaypointResult<std::sync::MutexGuard<'_, MintState>> {
        self.state
            .lock()
            .map_err(|_| WaypointError::Internal("Minter state lock poisoned".to_string()))
    }
}
