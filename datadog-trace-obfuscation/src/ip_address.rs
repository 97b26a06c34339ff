// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use regex::Regex;
use std::{borrow::Cow, collections::HashSet, net::Ipv6Addr, sync::OnceLock};

const ALLOWED_IP_ADDRESSES: [&str; 4] = [
    // localhost
    "127.0.0.1",
    "::1",
    // link-local cloud provider metadata server addresses
    "169.254.169.254",
    "fd00:ec2::254",
];

const PREFIX_REGEX_LITTERAL: &str = r"^((?:dnspoll|ftp|file|http|https):/{2,3})";
static PREFIX_REGEX: OnceLock<Regex> = OnceLock::new();

/// Quantizes a comma separated list of hosts.
///
/// Each entry which is an IP address is replaced using quantizeIP. Duplicate entries
/// post-quantization or collapsed into a single unique value. Entries which are not IP addresses
/// are left unchanged. Comma-separated host lists are common for peer tags like
/// peer.cassandra.contact.points, peer.couchbase.seed.nodes, peer.kafka.bootstrap.servers
///
/// The quantized value is return as a `Cow` containing the input slice `s` if no modification was
/// done or a new String if the value has been modified.
///
/// This quantization is used to reduce cardinality on peer tags in trace metrics. As such it is
/// not exhaustive and some ip format may not be obfuscated.
/// The reference implementation lives in [dd-go](https://github.com/DataDog/dd-go/blob/393e6de733807b20597d80b1e5103d6e823d8a0c/trace/pkg/peertags/peer_tags.go#L56)
pub fn quantize_peer_ip_addresses<'a>(s: &'a str) -> Cow<'a, str> {
    let values = s.split(',');
    let mut should_return_new_string = false; // Set to true if the function should return a modified
                                              // version of the string

    let quantized_values = values
        .map(|v| {
            if let Some(quantize_string) = quantize_ip(v) {
                should_return_new_string = true;
                Cow::from(quantize_string)
            } else {
                Cow::from(v)
            }
        })
        .collect::<Vec<Cow<'a, str>>>();

    // Quantized value list without duplicates
    let mut quantized_values_dedup: Vec<&str> = Vec::new();
    let mut quantized_values_set: HashSet<&str> = HashSet::new();

    for quantized_value in quantized_values.iter() {
        if quantized_values_set.insert(quantized_value) {
            quantized_values_dedup.push(quantized_value);
        } else {
            should_return_new_string = true;
        }
    }
    if should_return_new_string {
        Cow::from(quantized_values_dedup.join(","))
    } else {
        Cow::from(s)
    }
}

/// Replace valid ip address in `s` to allow quantization.
///
/// The ip is replaced if it is a valid IPv4 or v6
///
/// # Caveats
/// - IPv6 with zone specifier '%' are not detected
/// - IPv6 with suffix are not detected e.g. `::1-foo`
fn quantize_ip(s: &str) -> Option<String> {
    let (prefix, stripped_s) = split_prefix(s);
    if let Some((ip, suffix)) = parse_ip(stripped_s) {
        if !ALLOWED_IP_ADDRESSES.contains(&ip) {
            return Some(format!("{prefix}blocked-ip-address{suffix}"));
        }
    }
    None
}

/// Split the ip prefix, can be either a provider specific prefix or a protocol
fn split_prefix(s: &str) -> (&str, &str) {
    #[allow(clippy::unwrap_used)]
    if let Some(tail) = s.strip_prefix("ip-") {
        ("ip-", tail)
    } else if let Some(protocol) = PREFIX_REGEX
        .get_or_init(|| Regex::new(PREFIX_REGEX_LITTERAL).unwrap())
        .find(s)
    {
        s.split_at(protocol.end())
    } else {
        ("", s)
    }
}

/// Check if `s` starts with a valid ip. If it does return Some((ip, suffix)), else return None.
fn parse_ip(s: &str) -> Option<(&str, &str)> {
    for ch in s.chars() {
        // Determine the version of the ip
        match ch {
            '0'..='9' => continue,
            '.' | '-' | '_' => return parse_ip_v4(s, ch),
            ':' | 'A'..='F' | 'a'..='f' => {
                if s.parse::<Ipv6Addr>().is_ok() {
                    return Some((s, ""));
                } else {
                    return None;
                }
            }
            '[' => {
                // Parse IPv6 in [host]:port format
                if let Some((host, port)) = s[1..].split_once(']') {
                    if host.parse::<Ipv6Addr>().is_ok() {
                        return Some((host, port));
                    }
                }
                return None;
            }
            _ => return None,
        }
    }
    None
}

/// Check if `s` starts with a valid ipv4. If it does return Some(ip, suffix), else return None.
/// We implement a custom ipv4 parsing to allow `-` and `_` as separator.
fn parse_ip_v4(s: &str, sep: char) -> Option<(&str, &str)> {
    let mut field_value = 0;
    let mut field_digits = 0;
    let mut current_field = 0;
    let mut last_index = s.len();
    for (i, ch) in s.char_indices() {
        #[allow(clippy::unwrap_used)]
        if ch.is_ascii_digit() {
            // A field can't have a leading 0
            if field_digits == 1 && field_value == 0 {
                return None;
            }
            // Add digit to value, safe since ch is a digit
            field_value = field_value * 10 + ch.to_digit(10).unwrap();
            field_digits += 1;
            if field_value > 255 {
                return None;
            }
        } else if ch == sep {
            // A valid field has at least one digit
            if field_digits == 0 {
                return None;
            }
            // If we already have 4 fields, parsing is over
            if current_field == 3 {
                last_index = i;
                break;
            }
            field_value = 0;
            field_digits = 0;
            current_field += 1;
        } else {
            // An invalid character ends parsing
            last_index = i;
            break;
        }
    }
    // Check that we found at 4 fields and that the last one as at least one digit
    if field_digits > 0 && current_field == 3 {
        Some(s.split_at(last_index))
    } else {
        None
    }
}
