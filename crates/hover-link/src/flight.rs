use tracing::warn;

use crate::channel::CommandLink;
use crate::error::TransportError;
use crate::state::SharedState;

/// Blocking takeoff that only marks the vehicle flying if no emergency tripped
/// while the vehicle was climbing.
pub fn takeoff<L: CommandLink + ?Sized>(link: &L, state: &SharedState) -> Result<(), TransportError> {
    let ticket = state.begin_takeoff();
    link.takeoff()?;
    if !state.finish_takeoff(ticket) {
        warn!("takeoff returned after an emergency; staying grounded");
    }
    Ok(())
}
