use crate::error::{Error, Result};
use crate::kube_api::{KubeApi, PodPhase, PruneStop};
use crate::system::shutdown::ShutdownRx;
use kube::ResourceExt;

pub const USAGE: &str = "usage: kube-jobs [pods | namespaces | services | ingresses | prune <job-name>]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Pods,
    Namespaces,
    Services,
    Ingresses,
    Prune { job: String },
}

impl Command {
    /// Parse the arguments following the program name. No argument lists pods.
    pub fn parse<I>(args: I) -> Result<Command>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let command = match args.next().as_deref() {
            None | Some("pods") => Command::Pods,
            Some("namespaces") => Command::Namespaces,
            Some("services") => Command::Services,
            Some("ingresses") => Command::Ingresses,
            Some("prune") => match args.next() {
                Some(job) if !job.is_empty() => Command::Prune { job },
                _ => return Err(Error::Usage(format!("prune needs a job name\n{}", USAGE))),
            },
            Some(other) => return Err(Error::Usage(format!("unknown command {}\n{}", other, USAGE))),
        };
        match args.next() {
            Some(extra) => Err(Error::Usage(format!("unexpected argument {}\n{}", extra, USAGE))),
            None => Ok(command),
        }
    }

    /// Execute against `namespace` and return the lines to print.
    pub async fn run(
        &self,
        api: &KubeApi,
        namespace: &str,
        shutdown: ShutdownRx,
    ) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        match self {
            Command::Pods => {
                let pods = api.list_pods(namespace, None).await?;
                lines.push(format!("Pods in namespace '{}':", namespace));
                lines.extend(pods.iter().map(|pod| {
                    format!("- Name: {}, Status: {}", pod.name_any(), PodPhase::of(pod))
                }));
            }
            Command::Namespaces => {
                let namespaces = api.list_namespaces().await?;
                lines.extend(namespaces.iter().map(|ns| format!("- {}", ns.name_any())));
            }
            Command::Services => {
                let services = api.list_services(namespace).await?;
                lines.push(format!("Services in namespace '{}':", namespace));
                lines.extend(services.iter().map(|service| {
                    let service_type = service
                        .spec
                        .as_ref()
                        .and_then(|spec| spec.type_.clone())
                        .unwrap_or_default();
                    format!("- Name: {}, Type: {}", service.name_any(), service_type)
                }));
            }
            Command::Ingresses => {
                let ingresses = api.list_ingresses(namespace).await?;
                lines.push(format!("Ingresses in namespace '{}':", namespace));
                lines.extend(ingresses.iter().map(|ingress| {
                    let class = ingress
                        .spec
                        .as_ref()
                        .and_then(|spec| spec.ingress_class_name.clone())
                        .unwrap_or_default();
                    format!("- Name: {}, IngressClassName: {}", ingress.name_any(), class)
                }));
            }
            Command::Prune { job } => {
                let report = api.prune_pods(namespace, job, shutdown).await?;
                let outcome = match report.stop {
                    PruneStop::Completed => "completed",
                    PruneStop::StreamClosed => "watch closed",
                    PruneStop::Shutdown => "interrupted",
                };
                lines.push(format!(
                    "Pruned {}/{} pods of job {} ({}, {} failed deletions)",
                    report.deleted, report.expected, job, outcome, report.failed
                ));
            }
        }
        Ok(lines)
    }
}
