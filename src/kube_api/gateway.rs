use crate::config::settings::{Kube, UNSET_NAMESPACE};
use crate::error::{Error, Result};
use crate::kube_api::job::{JobDescriptor, PodPhase, build_pod, pod_name};
use crate::kube_api::resources::{build_namespace, build_service};
use crate::kube_api::{Cluster, KubeCluster};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Namespace, Pod, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Fails with `NotConfigured` while the namespace still holds the unset sentinel.
pub fn active_namespace(namespace: &str) -> Result<&str> {
    if namespace == UNSET_NAMESPACE {
        return Err(Error::NotConfigured);
    }
    Ok(namespace)
}

/// Maps an "already exists" rejection to success.
fn tolerate_existing<T>(result: kube::Result<T>) -> Result<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(err) if crate::error::is_already_exists(&err) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// One method per cluster operation. Every namespaced call receives its
/// namespace explicitly.
#[derive(Clone)]
pub struct KubeApi {
    cluster: Arc<dyn Cluster>,
}

impl KubeApi {
    pub fn new(cluster: Arc<dyn Cluster>) -> Self {
        Self { cluster }
    }

    pub async fn connect(settings: &Kube) -> Result<Self> {
        let cluster = KubeCluster::connect(settings).await?;
        Ok(Self::new(Arc::new(cluster)))
    }

    pub(crate) fn cluster(&self) -> &dyn Cluster {
        self.cluster.as_ref()
    }

    pub async fn create_job(&self, namespace: &str, job: &mut JobDescriptor) -> Result<()> {
        let namespace = active_namespace(namespace)?;
        let batch_job = job.to_job(namespace);
        let created = self
            .cluster
            .create_job(namespace, &batch_job)
            .await
            .inspect_err(|err| error!(name = job.name, namespace, error = %err, "Error creating job"))?;
        job.uid = created.uid();
        info!(
            name = created.name_any(),
            namespace = created.namespace().unwrap_or_default(),
            "Job created successfully"
        );
        Ok(())
    }

    pub async fn delete_job(&self, namespace: &str, job: &JobDescriptor) -> Result<()> {
        let namespace = active_namespace(namespace)?;
        self.cluster
            .delete_job(namespace, &job.name)
            .await
            .inspect_err(|err| error!(name = job.name, namespace, error = %err, "Error deleting job"))?;
        info!(name = job.name, namespace, "Job deleted successfully");
        Ok(())
    }

    pub async fn get_job(&self, namespace: &str, name: &str) -> Result<Job> {
        Ok(self.cluster.get_job(namespace, name).await?)
    }

    /// Create the pod for `ordinal` from the job's current pod template.
    /// Creating a pod that already exists succeeds.
    pub async fn create_pod(
        &self,
        namespace: &str,
        job: &JobDescriptor,
        ordinal: &str,
    ) -> Result<()> {
        let batch_job = self.get_job(namespace, &job.name).await?;
        let pod = build_pod(&batch_job, &job.name, namespace, ordinal)?;
        let name = pod_name(&job.name, ordinal);
        let created = tolerate_existing(self.cluster.create_pod(namespace, &pod).await)
            .inspect_err(|err| error!(name, namespace, error = %err, "Error creating pod"))?;
        if created {
            info!(name, namespace, "Pod created");
        } else {
            info!(name, namespace, "Pod already exists");
        }
        Ok(())
    }

    pub async fn list_pods(&self, namespace: &str, selector: Option<&str>) -> Result<Vec<Pod>> {
        let pods = self
            .cluster
            .list_pods(namespace, selector)
            .await
            .inspect_err(|err| error!(namespace, error = %err, "Error listing pods"))?;
        for pod in &pods {
            debug!(name = pod.name_any(), status = %PodPhase::of(pod), namespace, "Pod");
        }
        Ok(pods)
    }

    pub async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        Ok(self
            .cluster
            .list_namespaces()
            .await
            .inspect_err(|err| error!(error = %err, "Error listing namespaces"))?)
    }

    pub async fn list_services(&self, namespace: &str) -> Result<Vec<Service>> {
        Ok(self
            .cluster
            .list_services(namespace)
            .await
            .inspect_err(|err| error!(namespace, error = %err, "Error listing services"))?)
    }

    pub async fn list_ingresses(&self, namespace: &str) -> Result<Vec<Ingress>> {
        Ok(self
            .cluster
            .list_ingresses(namespace)
            .await
            .inspect_err(|err| error!(namespace, error = %err, "Error listing ingresses"))?)
    }

    pub async fn create_service(
        &self,
        namespace: &str,
        name: &str,
        port: i32,
        selector: BTreeMap<String, String>,
    ) -> Result<Service> {
        let service = build_service(name, namespace, port, selector);
        let created = self
            .cluster
            .create_service(namespace, &service)
            .await
            .inspect_err(|err| error!(name, namespace, error = %err, "Error creating service"))?;
        info!(name, namespace, "Service created successfully");
        Ok(created)
    }

    pub async fn provision_namespace(&self, name: &str) -> Result<()> {
        let namespace = build_namespace(name);
        if tolerate_existing(self.cluster.create_namespace(&namespace).await)? {
            info!(name, "Namespace created");
        } else {
            info!(name, "Namespace already exists");
        }
        Ok(())
    }

    pub async fn provision_role(&self, namespace: &str, role: &Role) -> Result<()> {
        let name = role.name_any();
        if tolerate_existing(self.cluster.create_role(namespace, role).await)? {
            info!(name, namespace, "Role created");
        } else {
            info!(name, namespace, "Role already exists");
        }
        Ok(())
    }

    pub async fn provision_service_account(
        &self,
        namespace: &str,
        account: &ServiceAccount,
    ) -> Result<()> {
        let name = account.name_any();
        if tolerate_existing(self.cluster.create_service_account(namespace, account).await)? {
            info!(name, namespace, "Service account created");
        } else {
            info!(name, namespace, "Service account already exists");
        }
        Ok(())
    }

    pub async fn provision_role_binding(
        &self,
        namespace: &str,
        binding: &RoleBinding,
    ) -> Result<()> {
        let name = binding.name_any();
        if tolerate_existing(self.cluster.create_role_binding(namespace, binding).await)? {
            info!(name, namespace, "Role binding created");
        } else {
            info!(name, namespace, "Role binding already exists");
        }
        Ok(())
    }
}
