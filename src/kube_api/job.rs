use crate::error::{Error, Result};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, EnvVarSource, ObjectFieldSelector, Pod, PodSpec, PodTemplateSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;

pub const JOB_NAME_LABEL: &str = "job-name";
pub const CONTROLLER_UID_LABEL: &str = "controller-uid";
pub const CONTROLLER_TYPE_LABEL: &str = "controller-type";
pub const JOB_INDEX_LABEL: &str = "job-index";
pub const POD_ORDINAL_ENV: &str = "POD_ORDINAL";

const RESTART_POLICY_ON_FAILURE: &str = "OnFailure";

/// Caller-side description of a single-container batch job.
///
/// `uid` stays empty until the job has been created in the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDescriptor {
    pub name: String,
    pub container_name: String,
    pub container_image: String,
    pub container_command: Vec<String>,
    pub ttl_seconds_after_finished: Option<i32>,
    pub uid: Option<String>,
}

impl JobDescriptor {
    pub fn new(name: impl Into<String>, image: impl Into<String>, command: Vec<String>) -> Self {
        let name = name.into();
        Self {
            container_name: name.clone(),
            name,
            container_image: image.into(),
            container_command: command,
            ttl_seconds_after_finished: None,
            uid: None,
        }
    }

    pub fn with_container_name(mut self, container_name: impl Into<String>) -> Self {
        self.container_name = container_name.into();
        self
    }

    pub fn with_ttl(mut self, seconds: i32) -> Self {
        self.ttl_seconds_after_finished = Some(seconds);
        self
    }

    pub fn to_job(&self, namespace: &str) -> Job {
        Job {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            spec: Some(JobSpec {
                ttl_seconds_after_finished: self.ttl_seconds_after_finished,
                template: PodTemplateSpec {
                    metadata: None,
                    spec: Some(PodSpec {
                        restart_policy: Some(RESTART_POLICY_ON_FAILURE.to_string()),
                        containers: vec![Container {
                            name: self.container_name.clone(),
                            image: Some(self.container_image.clone()),
                            command: Some(self.container_command.clone()),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

pub fn job_pod_selector(job_name: &str) -> String {
    format!("{}={}", JOB_NAME_LABEL, job_name)
}

pub fn pod_name(job_name: &str, ordinal: &str) -> String {
    format!("{}-{}-{}", job_name, job_name, ordinal)
}

/// Build a pod for `ordinal` out of the pod template of an existing job.
///
/// The job must carry the uid assigned by the cluster, it becomes the
/// controller owner of the pod.
pub fn build_pod(job: &Job, job_name: &str, namespace: &str, ordinal: &str) -> Result<Pod> {
    let job_uid = job
        .uid()
        .ok_or_else(|| Error::MissingJobUid(job_name.to_string()))?;
    let mut owner = job
        .controller_owner_ref(&())
        .ok_or_else(|| Error::MissingJobUid(job_name.to_string()))?;
    owner.block_owner_deletion = Some(true);

    let mut spec = job
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.clone())
        .unwrap_or_default();
    if let Some(container) = spec.containers.first_mut() {
        container.env.get_or_insert_with(Vec::new).push(EnvVar {
            name: POD_ORDINAL_ENV.to_string(),
            value: None,
            value_from: Some(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    api_version: None,
                    field_path: format!("metadata.labels['{}']", JOB_INDEX_LABEL),
                }),
                ..Default::default()
            }),
        });
    }

    let labels = BTreeMap::from([
        (JOB_NAME_LABEL.to_string(), job_name.to_string()),
        (CONTROLLER_UID_LABEL.to_string(), job_uid),
        (CONTROLLER_TYPE_LABEL.to_string(), "job".to_string()),
        (JOB_INDEX_LABEL.to_string(), ordinal.to_string()),
    ]);

    Ok(Pod {
        metadata: ObjectMeta {
            name: Some(pod_name(job_name, ordinal)),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(spec),
        status: None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    pub fn of(pod: &Pod) -> PodPhase {
        pod.status
            .as_ref()
            .and_then(|status| status.phase.as_deref())
            .map(PodPhase::from)
            .unwrap_or(PodPhase::Unknown)
    }

    /// Succeeded and Failed pods never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PodPhase::Succeeded | PodPhase::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Succeeded => "Succeeded",
            PodPhase::Failed => "Failed",
            PodPhase::Unknown => "Unknown",
        }
    }
}

impl From<&str> for PodPhase {
    fn from(phase: &str) -> Self {
        match phase {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

impl std::fmt::Display for PodPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
