// SPDX-FileCopyrightText: 2026 Hark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Requester network identity, as seen through proxies.

use std::net::SocketAddr;

use axum::{extract::ConnectInfo, http::HeaderMap};

/// The address fed to the fingerprinter.
///
/// Order: first hop of `X-Forwarded-For`, then `CloudFront-Viewer-Address`
/// (verbatim, port included), then the socket peer, else `"unknown"`. All
/// callers behind one NAT share an identity.
pub fn client_address(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    header_str(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .or_else(|| header_str(headers, "cloudfront-viewer-address").map(str::trim))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
