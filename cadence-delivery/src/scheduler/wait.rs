use std::time::Duration;

use cadence_common::shutdown::StopHandle;

/// Sleep for `total`, in steps of at most `slice`, giving up as soon as a stop
/// is requested.
///
/// The stop flag is checked before every step, so a request made mid-wait is
/// honoured within one `slice`. Returns `true` if the full duration elapsed.
pub async fn interruptible_sleep(total: Duration, slice: Duration, stop: &StopHandle) -> bool {
    let slice = slice.max(Duration::from_millis(1));
    let mut remaining = total;

    while !remaining.is_zero() {
        if !stop.is_running() {
            return false;
        }

        let step = remaining.min(slice);
        tokio::time::sleep(step).await;
        remaining -= step;
    }

    stop.is_running()
}
