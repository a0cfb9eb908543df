//! Turns an outside shutdown request into a quit event on the edge channel.

use super::tracking::{AxisSample, PoseSample, PoseSource, Role, TrackingEvent};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Wraps a source so that cancelling the token injects exactly one
/// [`TrackingEvent::Quit`] at the end of the next drain.
pub struct CancellableSource<S> {
    inner: S,
    token: CancellationToken,
    quit_sent: bool,
}

impl<S: PoseSource> CancellableSource<S> {
    pub fn new(inner: S, token: CancellationToken) -> Self {
        Self {
            inner,
            token,
            quit_sent: false,
        }
    }
}

impl<S: PoseSource> PoseSource for CancellableSource<S> {
    fn poll_edges(&mut self) -> Vec<TrackingEvent> {
        let mut events = self.inner.poll_edges();
        if !self.quit_sent && self.token.is_cancelled() {
            info!("Shutdown requested, queueing quit event");
            events.push(TrackingEvent::Quit);
            self.quit_sent = true;
        }
        events
    }

    fn pose(&mut self, role: Role) -> Option<PoseSample> {
        self.inner.pose(role)
    }

    fn axis(&mut self, role: Role) -> Option<AxisSample> {
        self.inner.axis(role)
    }

    fn is_connected(&mut self, role: Role) -> bool {
        self.inner.is_connected(role)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl PoseSource for Silent {
        fn poll_edges(&mut self) -> Vec<TrackingEvent> {
            Vec::new()
        }
        fn pose(&mut self, _role: Role) -> Option<PoseSample> {
            None
        }
        fn axis(&mut self, _role: Role) -> Option<AxisSample> {
            None
        }
        fn is_connected(&mut self, _role: Role) -> bool {
            false
        }
    }

    #[test]
    fn quit_is_injected_once_after_cancel() {
        let token = CancellationToken::new();
        let mut source = CancellableSource::new(Silent, token.clone());

        assert!(source.poll_edges().is_empty());
        token.cancel();
        assert_eq!(source.poll_edges(), vec![TrackingEvent::Quit]);
        assert!(source.poll_edges().is_empty());
    }
}
