use crate::config::settings::Kube;
use crate::error::Result;
use crate::kube_api::{Cluster, PodEvent, PodEvents};
use async_trait::async_trait;
use futures::{StreamExt, future};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Namespace, Pod, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Api, Client, Config};
use tracing::{debug, info};

/// `Cluster` backed by a live API server.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub async fn connect(settings: &Kube) -> Result<Self> {
        let kubeconfig = match &settings.kubeconfig {
            Some(path) => {
                debug!(path, "Reading kubeconfig");
                Kubeconfig::read_from(path)?
            }
            None => Kubeconfig::read()?,
        };
        let config =
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        info!(cluster_url = %config.cluster_url, "Connecting to kubernetes");
        let client = Client::try_from(config)?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn jobs(&self, namespace: &str) -> Api<Job> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn list_params(selector: Option<&str>) -> ListParams {
    match selector {
        Some(selector) => ListParams::default().labels(selector),
        None => ListParams::default(),
    }
}

/// Client errors the server will keep returning however often the watcher
/// retries. `410 Gone` and `429` are recovered by the watcher itself.
fn is_refusal(code: u16) -> bool {
    (400..500).contains(&code) && code != 410 && code != 429
}

pub(crate) fn to_pod_event(
    event: watcher::Result<watcher::Event<Pod>>,
) -> Option<kube::Result<PodEvent>> {
    match event {
        Ok(watcher::Event::Apply(pod)) | Ok(watcher::Event::InitApply(pod)) => {
            Some(Ok(PodEvent::Applied(pod)))
        }
        Ok(watcher::Event::Delete(pod)) => Some(Ok(PodEvent::Deleted(pod))),
        Ok(watcher::Event::Init) | Ok(watcher::Event::InitDone) => None,
        Err(
            watcher::Error::InitialListFailed(kube::Error::Api(response))
            | watcher::Error::WatchStartFailed(kube::Error::Api(response))
            | watcher::Error::WatchFailed(kube::Error::Api(response))
            | watcher::Error::WatchError(response),
        ) if is_refusal(response.code) => Some(Err(kube::Error::Api(response))),
        Err(err) => Some(Ok(PodEvent::Unexpected(err.to_string()))),
    }
}

#[async_trait]
impl Cluster for KubeCluster {
    async fn create_job(&self, namespace: &str, job: &Job) -> kube::Result<Job> {
        self.jobs(namespace).create(&PostParams::default(), job).await
    }

    async fn get_job(&self, namespace: &str, name: &str) -> kube::Result<Job> {
        self.jobs(namespace).get(name).await
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> kube::Result<()> {
        self.jobs(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> kube::Result<Pod> {
        self.pods(namespace).create(&PostParams::default(), pod).await
    }

    async fn list_pods(&self, namespace: &str, selector: Option<&str>) -> kube::Result<Vec<Pod>> {
        let pods = self.pods(namespace).list(&list_params(selector)).await?;
        Ok(pods.items)
    }

    async fn delete_pod(
        &self,
        namespace: &str,
        name: &str,
        params: &DeleteParams,
    ) -> kube::Result<()> {
        self.pods(namespace).delete(name, params).await.map(|_| ())
    }

    async fn watch_pods(&self, namespace: &str, selector: &str) -> kube::Result<PodEvents> {
        let config = watcher::Config::default().labels(selector);
        let events = watcher(self.pods(namespace), config)
            .default_backoff()
            .filter_map(|event| future::ready(to_pod_event(event)))
            .boxed();
        Ok(events)
    }

    async fn list_namespaces(&self) -> kube::Result<Vec<Namespace>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        Ok(namespaces.list(&ListParams::default()).await?.items)
    }

    async fn create_namespace(&self, namespace: &Namespace) -> kube::Result<Namespace> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        namespaces.create(&PostParams::default(), namespace).await
    }

    async fn list_services(&self, namespace: &str) -> kube::Result<Vec<Service>> {
        Ok(self
            .services(namespace)
            .list(&ListParams::default())
            .await?
            .items)
    }

    async fn create_service(&self, namespace: &str, service: &Service) -> kube::Result<Service> {
        self.services(namespace)
            .create(&PostParams::default(), service)
            .await
    }

    async fn list_ingresses(&self, namespace: &str) -> kube::Result<Vec<Ingress>> {
        let ingresses: Api<Ingress> = Api::namespaced(self.client.clone(), namespace);
        Ok(ingresses.list(&ListParams::default()).await?.items)
    }

    async fn create_role(&self, namespace: &str, role: &Role) -> kube::Result<Role> {
        let roles: Api<Role> = Api::namespaced(self.client.clone(), namespace);
        roles.create(&PostParams::default(), role).await
    }

    async fn create_service_account(
        &self,
        namespace: &str,
        account: &ServiceAccount,
    ) -> kube::Result<ServiceAccount> {
        let accounts: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        accounts.create(&PostParams::default(), account).await
    }

    async fn create_role_binding(
        &self,
        namespace: &str,
        binding: &RoleBinding,
    ) -> kube::Result<RoleBinding> {
        let bindings: Api<RoleBinding> = Api::namespaced(self.client.clone(), namespace);
        bindings.create(&PostParams::default(), binding).await
    }
}
