//! Opaque pagination cursors bound to the originating query.
//!
//! A cursor carries `(query_fingerprint, offset)`. The fingerprint covers
//! every parameter that affects result ordering, so changing any of them
//! invalidates outstanding cursors instead of producing incoherent pages.

use std::hash::Hasher;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use twox_hash::XxHash64;

use passagedb_core::error::{Error, Result};
use passagedb_core::types::{SearchRequest, SortOrder, YearFilter};

const VERSION: &str = "v1";

/// Canonical serialization of the ordering-relevant request parameters.
/// Field order and separators are part of the wire contract.
fn canonical_request(req: &SearchRequest) -> String {
    let year = match req.year {
        None => "-".to_string(),
        Some(YearFilter::Exact(y)) => y.to_string(),
        Some(YearFilter::Range { min, max }) => format!("{min}..{max}"),
    };
    let sort = match req.sort {
        SortOrder::Relevance => "relevance",
        SortOrder::Recency => "recency",
    };
    format!(
        "q={}\x1fyear={}\x1fdoc={}\x1fsort={}\x1fper_doc={}\x1fneighbors={}",
        req.q.trim(),
        year,
        req.doc_id.as_deref().unwrap_or("-"),
        sort,
        req.per_doc,
        req.neighbors,
    )
}

pub fn query_fingerprint(req: &SearchRequest) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(canonical_request(req).as_bytes());
    hasher.finish()
}

pub fn encode(fingerprint: u64, offset: usize) -> String {
    URL_SAFE_NO_PAD.encode(format!("{VERSION}:{fingerprint:016x}:{offset}"))
}

pub fn decode(token: &str) -> Result<(u64, usize)> {
    let raw = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|e| Error::Decode(format!("cursor is not valid base64: {e}")))?;
    let raw = String::from_utf8(raw).map_err(|_| Error::Decode("cursor is not valid utf-8".into()))?;

    let mut parts = raw.split(':');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(version), Some(fp), Some(off), None) if version == VERSION => {
            let fingerprint = u64::from_str_radix(fp, 16)
                .map_err(|_| Error::Decode("cursor fingerprint is not hex".into()))?;
            let offset = off
                .parse()
                .map_err(|_| Error::Decode("cursor offset is not an integer".into()))?;
            Ok((fingerprint, offset))
        }
        _ => Err(Error::Decode("unrecognized cursor layout".into())),
    }
}
