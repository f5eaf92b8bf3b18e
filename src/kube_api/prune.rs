use crate::error::Result;
use crate::kube_api::job::{PodPhase, job_pod_selector};
use crate::kube_api::{KubeApi, PodEvent};
use crate::system::shutdown::ShutdownRx;
use futures::StreamExt;
use kube::ResourceExt;
use kube::api::DeleteParams;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneStop {
    /// As many pods were deleted as were listed when pruning started.
    Completed,
    /// The pod subscription ended before every pod was deleted.
    StreamClosed,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub expected: usize,
    pub deleted: usize,
    pub failed: usize,
    pub stop: PruneStop,
}

impl KubeApi {
    /// Delete every pod of `job_name` once it reaches a terminal phase.
    ///
    /// The number of pods to wait for is taken from a listing made before the
    /// watch opens; pods created for the job afterwards are not waited for.
    /// A failed delete is logged and does not count toward that number. A
    /// watch the server refuses ends pruning with an error. The watch is
    /// dropped on every return path.
    pub async fn prune_pods(
        &self,
        namespace: &str,
        job_name: &str,
        mut shutdown: ShutdownRx,
    ) -> Result<PruneReport> {
        let selector = job_pod_selector(job_name);
        let expected = self.list_pods(namespace, Some(&selector)).await?.len();
        let mut events = self
            .cluster()
            .watch_pods(namespace, &selector)
            .await
            .inspect_err(|err| error!(job = job_name, namespace, error = %err, "Error watching pods"))?;
        info!(job = job_name, namespace, expected, "Watching pods for pruning");

        let delete_params = DeleteParams::foreground();
        let mut pruned: HashSet<String> = HashSet::new();
        let mut report = PruneReport {
            expected,
            deleted: 0,
            failed: 0,
            stop: PruneStop::Completed,
        };

        while report.deleted < expected {
            let event = tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    report.stop = PruneStop::Shutdown;
                    break;
                }
                event = events.next() => event,
            };
            let pod = match event {
                Some(Ok(PodEvent::Applied(pod))) => pod,
                Some(Ok(PodEvent::Deleted(pod))) => {
                    debug!(name = pod.name_any(), "Pod removed");
                    continue;
                }
                Some(Ok(PodEvent::Unexpected(message))) => {
                    warn!(error = message, "Unexpected event from pod watcher");
                    continue;
                }
                Some(Err(err)) => {
                    error!(job = job_name, namespace, error = %err, "Pod watch refused");
                    return Err(err.into());
                }
                None => {
                    report.stop = PruneStop::StreamClosed;
                    break;
                }
            };

            let name = pod.name_any();
            let phase = PodPhase::of(&pod);
            if !phase.is_terminal() || pruned.contains(&name) {
                continue;
            }
            info!(name, status = %phase, "Pod finished, deleting");
            let deleted = self
                .cluster()
                .delete_pod(namespace, &name, &delete_params)
                .await;
            match deleted {
                Ok(()) => {
                    info!(name, "Deleted pod");
                    pruned.insert(name);
                    report.deleted += 1;
                }
                Err(err) => {
                    error!(name, error = %err, "Error deleting pod");
                    report.failed += 1;
                }
            }
        }
        drop(events);

        match report.stop {
            PruneStop::Completed => {
                info!(job = job_name, deleted = report.deleted, "All pods have been deleted")
            }
            PruneStop::StreamClosed => warn!(
                job = job_name,
                deleted = report.deleted,
                expected,
                "Pod watch closed before all pods were deleted"
            ),
            PruneStop::Shutdown => info!(
                job = job_name,
                deleted = report.deleted,
                expected,
                "Pruning interrupted"
            ),
        }
        Ok(report)
    }
}
