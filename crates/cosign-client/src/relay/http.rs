use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use cosign_errors::{Error, Result};
use cosign_log::debug;
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::{Page, ProposeBody, ProposeTransactionRequest, RelayService, RelayedTransaction, SafeInfo};

/// Safe Transaction Service client
///
/// No timeout is configured beyond reqwest's defaults and nothing is retried.
#[derive(Debug, Clone)]
pub struct HttpRelay {
    base_url: Url,
    http_client: HttpClient,
}

impl HttpRelay {
    /// Create a relay client rooted at the service URL, e.g.
    /// `https://safe-transaction-sepolia.safe.global`
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| Error::invalid_configuration(format!("relay url {base_url:?}:: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            http_client: HttpClient::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::invalid_configuration(format!("relay endpoint {path}:: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "relay GET");
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(Error::transport)?;
        check(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::transport(format!("malformed relay response:: {e}")))
    }

    async fn post_json<B: Serialize + Sync>(&self, url: Url, body: &B) -> Result<()> {
        debug!(%url, "relay POST");
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::transport)?;
        check(response).await.map(|_| ())
    }

    async fn collect_pages<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>> {
        let mut results = Vec::new();
        let mut next = Some(first);
        while let Some(url) = next.take() {
            let page: Page<T> = self.get_json(url).await?;
            results.extend(page.results);
            next = page
                .next
                .map(|link| {
                    Url::parse(&link).map_err(|e| Error::transport(format!("bad page link:: {e}")))
                })
                .transpose()?;
        }
        Ok(results)
    }
}

/// Map non-success statuses to port errors
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().clone();
    let message = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(Error::not_found(format!("{url}:: {message}")));
    }
    Err(Error::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RelayService for HttpRelay {
    #[tracing::instrument(skip(self, request), fields(safe = %request.safe_address, safe_tx_hash = %request.safe_tx_hash))]
    async fn propose_transaction(&self, request: &ProposeTransactionRequest) -> Result<()> {
        let url = self.endpoint(&format!(
            "api/v1/safes/{}/multisig-transactions/",
            request.safe_address.to_checksum(None)
        ))?;
        self.post_json(url, &ProposeBody::from(request)).await
    }

    async fn get_pending_transactions(&self, safe: Address) -> Result<Vec<RelayedTransaction>> {
        let nonce = self.get_safe_info(safe).await?.nonce;
        let mut url = self.endpoint(&format!(
            "api/v1/safes/{}/multisig-transactions/",
            safe.to_checksum(None)
        ))?;
        url.query_pairs_mut()
            .append_pair("executed", "false")
            .append_pair("nonce__gte", &nonce.to_string());
        self.collect_pages(url).await
    }

    async fn get_transaction(&self, safe_tx_hash: B256) -> Result<RelayedTransaction> {
        let url = self.endpoint(&format!("api/v1/multisig-transactions/{safe_tx_hash}/"))?;
        self.get_json(url).await
    }

    #[tracing::instrument(skip(self, signature))]
    async fn confirm_transaction(&self, safe_tx_hash: B256, signature: &Bytes) -> Result<()> {
        let url = self.endpoint(&format!(
            "api/v1/multisig-transactions/{safe_tx_hash}/confirmations/"
        ))?;
        self.post_json(url, &serde_json::json!({ "signature": signature }))
            .await
    }

    async fn get_safe_info(&self, safe: Address) -> Result<SafeInfo> {
        let url = self.endpoint(&format!("api/v1/safes/{}/", safe.to_checksum(None)))?;
        self.get_json(url).await
    }
}
