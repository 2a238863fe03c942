use crate::request::{Reply, Request};
use crate::traits::ControllerApi;
use log::{debug, error};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

/// Runs controller requests off the panel thread.
///
/// Every request gets its own worker thread, so a slow command never holds up
/// a poll and two polls may overlap. Replies come back as `M` on the channel
/// the panel thread already listens to.
pub struct RequestRunner<A, M> {
    api: Arc<A>,
    replies: Sender<M>,
}

impl<A, M> RequestRunner<A, M>
where
    A: ControllerApi + Send + Sync + 'static,
    M: From<Reply> + Send + 'static,
{
    pub fn new(api: Arc<A>, replies: Sender<M>) -> Self {
        RequestRunner { api, replies }
    }

    pub fn submit(&self, request: Request) {
        let api = Arc::clone(&self.api);
        let replies = self.replies.clone();
        let spawned = thread::Builder::new()
            .name("controller-request".into())
            .spawn(move || {
                let reply = request.execute(api.as_ref());
                if replies.send(M::from(reply)).is_err() {
                    debug!("Panel gone, dropping reply to {:?}", request);
                }
            });
        if let Err(e) = spawned {
            error!("Failed to start request worker: {}", e);
        }
    }

    pub fn submit_all<I>(&self, requests: I)
    where
        I: IntoIterator<Item = Request>,
    {
        for request in requests {
            self.submit(request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::StatusReconciler;
    use crate::status::{LampColor, OperatingMode, ServerStatus};
    use crate::traits::{ApiError, ApiResult};
    use std::sync::mpsc::{self, Receiver};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Polls hang until the test opens the gate; commands answer at once.
    struct GatedApi {
        gate: Mutex<Receiver<()>>,
    }

    impl ControllerApi for GatedApi {
        fn poll(&self) -> ApiResult<ServerStatus> {
            let gate = self.gate.lock().map_err(|e| ApiError::Transport(e.to_string()))?;
            gate.recv().map_err(|e| ApiError::Transport(e.to_string()))?;
            Err(ApiError::Transport("gate opened".into()))
        }

        fn set_mode(&self, _mode: OperatingMode) -> ApiResult<()> {
            Ok(())
        }

        fn set_timing(&self, _green_s: u32, _yellow_s: u32) -> ApiResult<()> {
            Ok(())
        }

        fn set_lamp(&self, _lamp_id: u32, _color: LampColor) -> ApiResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_slow_poll_does_not_block_commands() {
        let (open, gate) = mpsc::channel();
        let api = Arc::new(GatedApi { gate: Mutex::new(gate) });
        let (tx, rx) = mpsc::channel::<Reply>();
        let runner = RequestRunner::new(api, tx);

        let ticket = StatusReconciler::new().begin_poll();
        runner.submit(Request::Poll(ticket));
        runner.submit_all([
            Request::SetMode(OperatingMode::Manual),
            Request::SetLamp { lamp_id: 1, color: LampColor::Red },
        ]);

        let mut early = vec![
            rx.recv_timeout(Duration::from_secs(5)).expect("first command reply"),
            rx.recv_timeout(Duration::from_secs(5)).expect("second command reply"),
        ];
        early.sort_by_key(|r| matches!(r, Reply::LampSet { .. }));
        assert_eq!(
            early,
            vec![
                Reply::ModeSet { target: OperatingMode::Manual, result: Ok(()) },
                Reply::LampSet { lamp_id: 1, color: LampColor::Red, result: Ok(()) },
            ]
        );

        open.send(()).unwrap();
        match rx.recv_timeout(Duration::from_secs(5)).expect("poll reply") {
            Reply::Polled(t, Err(ApiError::Transport(_))) => assert_eq!(t, ticket),
            other => panic!("expected poll reply, got {:?}", other),
        }
    }
}
