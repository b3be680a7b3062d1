//! IP 地址处理工具
//!
//! - 查询参数的 IP 校验与规范化
//! - 限流用的客户端标识提取（支持 trusted_proxies 与 CIDR 匹配）

use std::net::{IpAddr, SocketAddr};

use actix_web::dev::ServiceRequest;
use actix_web::http::header::HeaderMap;
use tracing::{debug, trace};

/// 无法确定对端地址时使用的客户端标识
pub const UNKNOWN_CLIENT: &str = "unknown";

/// 解析 IP 字符串，忽略首尾空白
pub fn parse_ip(raw: &str) -> Option<IpAddr> {
    raw.trim().parse().ok()
}

/// 规范化 IP 文本（如 `0:0::1` -> `::1`），无法解析时原样返回去空白后的字符串
pub fn normalize_ip(raw: &str) -> String {
    match parse_ip(raw) {
        Some(ip) => ip.to_string(),
        None => raw.trim().to_string(),
    }
}

/// 解析对端地址，兼容 `ip:port` 与纯 IP
fn parse_peer(peer: &str) -> Option<IpAddr> {
    peer.parse::<SocketAddr>()
        .map(|addr| addr.ip())
        .ok()
        .or_else(|| peer.parse::<IpAddr>().ok())
}

/// 检查对端地址是否在可信代理列表中
pub fn is_trusted_proxy(peer: &str, trusted_proxies: &[String]) -> bool {
    let Some(ip) = parse_peer(peer) else {
        return false;
    };

    trusted_proxies.iter().any(|proxy| {
        if proxy.contains('/') {
            ip_in_cidr(&ip, proxy)
        } else {
            proxy.parse::<IpAddr>().is_ok_and(|p| p == ip)
        }
    })
}

/// CIDR 检查，IPv4/IPv6 不混配
pub fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = cidr.split_once('/') else {
        return false;
    };
    let Ok(prefix_len) = prefix_len.parse::<u32>() else {
        return false;
    };
    let Ok(network) = network.parse::<IpAddr>() else {
        return false;
    };

    match (ip, network) {
        (IpAddr::V4(ip), IpAddr::V4(net)) if prefix_len <= 32 => {
            let mask = u32::MAX.checked_shl(32 - prefix_len).unwrap_or(0);
            (u32::from(*ip) & mask) == (u32::from(net) & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) if prefix_len <= 128 => {
            let mask = u128::MAX.checked_shl(128 - prefix_len).unwrap_or(0);
            (u128::from(*ip) & mask) == (u128::from(net) & mask)
        }
        _ => false,
    }
}

/// 从请求头提取转发的 IP（优先 X-Forwarded-For 第一项，其次 X-Real-IP）
pub fn forwarded_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
}

/// 确定客户端标识
///
/// 默认使用连接对端 IP；只有对端在 `trusted_proxies` 中时才采信转发头，
/// 且转发值必须是合法 IP。
pub fn resolve_client_id(
    peer: Option<&str>,
    headers: &HeaderMap,
    trusted_proxies: &[String],
) -> String {
    let Some(peer) = peer else {
        return UNKNOWN_CLIENT.to_string();
    };

    if !trusted_proxies.is_empty()
        && is_trusted_proxy(peer, trusted_proxies)
        && let Some(forwarded) = forwarded_ip_from_headers(headers)
    {
        match parse_ip(&forwarded) {
            Some(ip) => {
                trace!("Trusted proxy {} forwarded client {}", peer, ip);
                return ip.to_string();
            }
            // 非 IP 的转发值不能作为限流 key，退回对端地址
            None => debug!(
                "Trusted proxy {} forwarded a non-IP client id, using peer",
                peer
            ),
        }
    }

    parse_peer(peer)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| peer.to_string())
}

/// 从 ServiceRequest 提取客户端标识
pub fn client_id_for(req: &ServiceRequest, trusted_proxies: &[String]) -> String {
    let peer = req.peer_addr().map(|addr| addr.ip().to_string());
    resolve_client_id(peer.as_deref(), req.headers(), trusted_proxies)
}
