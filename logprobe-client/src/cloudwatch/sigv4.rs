//! AWS Signature Version 4 request signing

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::error::{ClientError, Result};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Static credentials plus the scope they sign for
#[derive(Debug, Clone)]
pub struct SigningParams<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub session_token: Option<&'a str>,
    pub region: &'a str,
    pub service: &'a str,
}

/// A request to sign; header names are matched case-insensitively
#[derive(Debug, Clone)]
pub struct SignableRequest<'a> {
    pub method: &'a str,
    pub host: &'a str,
    pub path: &'a str,
    pub headers: &'a [(&'a str, &'a str)],
    pub payload: &'a [u8],
}

/// Returns the headers to add to `request`: `x-amz-date`, optionally
/// `x-amz-security-token`, and `authorization`
pub fn sign(
    params: &SigningParams<'_>,
    request: &SignableRequest<'_>,
    now: DateTime<Utc>,
) -> Result<Vec<(String, String)>> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();

    let mut canonical_headers: BTreeMap<String, String> = request
        .headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    canonical_headers.insert("host".to_string(), request.host.to_string());
    canonical_headers.insert("x-amz-date".to_string(), amz_date.clone());
    if let Some(token) = params.session_token {
        canonical_headers.insert("x-amz-security-token".to_string(), token.to_string());
    }

    let signed_headers = canonical_headers
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(";");
    let header_block: String = canonical_headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect();

    let canonical_request = format!(
        "{}\n{}\n\n{}\n{}\n{}",
        request.method,
        if request.path.is_empty() { "/" } else { request.path },
        header_block,
        signed_headers,
        hex::encode(Sha256::digest(request.payload)),
    );

    let scope = format!(
        "{}/{}/{}/aws4_request",
        date, params.region, params.service
    );
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes())),
    );

    let key = signing_key(params.secret_access_key, &date, params.region, params.service)?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    let mut headers = vec![("x-amz-date".to_string(), amz_date)];
    if let Some(token) = params.session_token {
        headers.push(("x-amz-security-token".to_string(), token.to_string()));
    }
    headers.push((
        "authorization".to_string(),
        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, params.access_key_id, scope, signed_headers, signature
        ),
    ));

    Ok(headers)
}

/// Derives the per-day signing key
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ClientError::InvalidRequest(format!("invalid signing key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
