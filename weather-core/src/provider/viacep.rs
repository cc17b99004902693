use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{Instrument, Span, debug, field, info_span};

use crate::{PostalCode, PostalCodeRecord, TraceContext};

use super::{PostalCodeError, PostalCodeProvider, join_url};

/// PostalCodeClient backed by ViaCEP.
///
/// ViaCEP answers unknown codes with `200 {"erro": true}`, so the HTTP status
/// is never interpreted here; only transport and decoding can fail.
#[derive(Debug, Clone)]
pub struct ViaCepProvider {
    base_url: String,
    http: Client,
}

impl ViaCepProvider {
    pub fn new(base_url: impl Into<String>, http: Client) -> Self {
        Self { base_url: base_url.into(), http }
    }

    fn lookup_url(&self, code: &PostalCode) -> String {
        join_url(&self.base_url, &format!("ws/{code}/json/"))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VcResponse {
    cep: String,
    estado: String,
    localidade: String,
    bairro: String,
    logradouro: String,
}

impl From<VcResponse> for PostalCodeRecord {
    fn from(r: VcResponse) -> Self {
        Self {
            code: r.cep,
            state: r.estado,
            city: r.localidade,
            neighborhood: r.bairro,
            street: r.logradouro,
        }
    }
}

#[async_trait]
impl PostalCodeProvider for ViaCepProvider {
    async fn resolve(
        &self,
        code: &PostalCode,
        cx: &TraceContext,
    ) -> Result<PostalCodeRecord, PostalCodeError> {
        let span = info_span!(
            "viacep.resolve",
            cep = %code,
            city = field::Empty,
            trace_id = field::Empty,
        );
        let cx = cx.child(&span);

        async move {
            let res = self
                .http
                .get(self.lookup_url(code))
                .headers(cx.headers())
                .send()
                .await
                .map_err(PostalCodeError::Transport)?;

            let status = res.status();
            let body = res.bytes().await.map_err(PostalCodeError::Transport)?;

            let parsed: VcResponse =
                serde_json::from_slice(&body).map_err(PostalCodeError::Decode)?;
            let record = PostalCodeRecord::from(parsed);

            Span::current().record("city", record.city.as_str());
            debug!(%status, found = record.is_found(), "postal code provider answered");

            Ok(record)
        }
        .instrument(span)
        .await
    }
}
