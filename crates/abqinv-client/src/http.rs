//! HTTP client for the Abiquo API

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use abqinv_api::media::{self, rel};
use abqinv_api::{Collection, DiskDto, Link, LinkSet, NicDto, VirtualMachineDto};

use crate::auth::Credentials;
use crate::error::{ClientError, Result};
use crate::traits::CloudApi;

/// Read-only HTTP client for the Abiquo API
#[derive(Debug, Clone)]
pub struct AbiquoClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
}

impl AbiquoClient {
    /// Create a new client
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    ///
    /// # Example
    /// ```no_run
    /// use abqinv_client::{AbiquoClient, Credentials};
    ///
    /// let creds = Credentials::Basic {
    ///     username: "admin".into(),
    ///     password: Some("xabiquo".into()),
    /// };
    /// let client = AbiquoClient::new("https://abiquo.example.com/api", creds)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(base_url: impl AsRef<str>, credentials: Credentials) -> Result<Self> {
        Self::with_client(base_url, credentials, Client::new())
    }

    /// Create a client that optionally skips TLS certificate verification
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the TLS backend fails
    /// to initialize.
    pub fn with_verify(
        base_url: impl AsRef<str>,
        credentials: Credentials,
        verify_tls: bool,
    ) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;
        Self::with_client(base_url, credentials, client)
    }

    /// Create a new client with a custom `reqwest::Client`
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    pub fn with_client(
        base_url: impl AsRef<str>,
        credentials: Credentials,
        client: Client,
    ) -> Result<Self> {
        let mut base_url = Url::parse(base_url.as_ref())?;
        // Url::join drops the last path segment unless it ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Build a full URL from a path relative to the API root
    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(ClientError::Url)
    }

    fn authorize(&self, request: RequestBuilder, url: &Url) -> Result<RequestBuilder> {
        Ok(match &self.credentials {
            Credentials::Basic { username, password } => {
                request.basic_auth(username, password.as_deref())
            }
            Credentials::OAuth1(creds) => {
                request.header(AUTHORIZATION, creds.authorization("GET", url)?)
            }
        })
    }

    /// Perform a GET request and deserialize the response
    async fn get<T: DeserializeOwned>(&self, url: Url, accept: &str) -> Result<T> {
        debug!(%url, accept, "GET");
        let request = self.client.get(url.clone()).header(ACCEPT, accept);
        let response = self.authorize(request, &url)?.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, message });
        }

        Ok(response.json().await?)
    }

    /// GET every page of a collection, following `next` links
    async fn get_collection<T: DeserializeOwned>(&self, url: Url, accept: &str) -> Result<Vec<T>> {
        walk_pages(url, move |page| self.get::<Collection<T>>(page, accept)).await
    }

    /// Resolve a relation on a resource's links
    fn follow<'a>(links: &'a [Link], rel: &str, resource: &str) -> Result<(Url, &'a str)> {
        let link = links
            .find_rel(rel)
            .ok_or_else(|| ClientError::MissingLink {
                rel: rel.to_string(),
                resource: resource.to_string(),
            })?;
        let href = link.href.as_deref().ok_or_else(|| ClientError::MissingLink {
            rel: rel.to_string(),
            resource: resource.to_string(),
        })?;
        let accept = link.media_type.as_deref().unwrap_or(media::JSON);
        Ok((Url::parse(href)?, accept))
    }

    /// Follow a collection relation; a VM without the link has none of them
    async fn follow_collection<T: DeserializeOwned>(
        &self,
        vm: &VirtualMachineDto,
        rel: &str,
    ) -> Result<Vec<T>> {
        match Self::follow(&vm.links, rel, &vm.name) {
            Ok((url, accept)) => self.get_collection(url, accept).await,
            Err(e) if e.is_missing_link() => {
                debug!(vm = %vm.name, rel, "relation not present");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

/// Fetch pages starting at `first` until one has no `next` link
///
/// A page is never fetched twice, so a `next` cycle ends the walk.
async fn walk_pages<T, F, Fut>(first: Url, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Url) -> Fut,
    Fut: Future<Output = Result<Collection<T>>>,
{
    let mut items = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(first);

    while let Some(url) = next.take() {
        seen.insert(url.clone());
        let page = fetch(url).await?;
        if let Some(href) = page.next_href() {
            let href = Url::parse(href)?;
            if seen.contains(&href) {
                warn!(%href, "pagination loops back to a fetched page, stopping");
            } else {
                next = Some(href);
            }
        }
        items.extend(page.collection);
    }

    Ok(items)
}

#[async_trait]
impl CloudApi for AbiquoClient {
    #[instrument(skip(self))]
    async fn virtual_machines(&self) -> Result<Vec<VirtualMachineDto>> {
        let url = self.url(media::VIRTUAL_MACHINES_PATH)?;
        let vms: Vec<VirtualMachineDto> =
            self.get_collection(url, media::VIRTUAL_MACHINES).await?;
        debug!(count = vms.len(), "listed virtual machines");
        Ok(vms)
    }

    #[instrument(skip(self, vm), fields(vm = %vm.name))]
    async fn nics(&self, vm: &VirtualMachineDto) -> Result<Vec<NicDto>> {
        self.follow_collection(vm, rel::NICS).await
    }

    #[instrument(skip(self, vm), fields(vm = %vm.name))]
    async fn hard_disks(&self, vm: &VirtualMachineDto) -> Result<Vec<DiskDto>> {
        self.follow_collection(vm, rel::HARD_DISKS).await
    }

    #[instrument(skip(self, vm), fields(vm = %vm.name))]
    async fn volumes(&self, vm: &VirtualMachineDto) -> Result<Vec<DiskDto>> {
        self.follow_collection(vm, rel::VOLUMES).await
    }

    #[instrument(skip(self, vm), fields(vm = %vm.name))]
    async fn template(&self, vm: &VirtualMachineDto) -> Result<Value> {
        let (url, accept) = Self::follow(&vm.links, rel::TEMPLATE, &vm.name)?;
        self.get(url, accept).await
    }

    #[instrument(skip(self, vm), fields(vm = %vm.name))]
    async fn metadata(&self, vm: &VirtualMachineDto) -> Result<Value> {
        let (url, accept) = Self::follow(&vm.links, rel::METADATA, &vm.name)?;
        self.get(url, accept).await
    }
}
