//! Path matching
//!
//! Matches a request target (path plus optional query string) against a
//! route pattern such as `/wallets/{wallet_id}/balance` in a single
//! left-to-right pass, extracting wildcard segments and query parameters.
//!
//! A wildcard accepts either a bare segment (`/wallets/W1/balance`) or a
//! braced one (`/wallets/{W1}/balance`). Patterns are ASCII.

/// Deposit into a wallet
pub const WALLET_DEPOSITS: &str = "/wallets/{wallet_id}/deposits";
/// Withdraw from a wallet
pub const WALLET_WITHDRAWALS: &str = "/wallets/{wallet_id}/withdrawals";
/// Wallet balance
pub const WALLET_BALANCE: &str = "/wallets/{wallet_id}/balance";
/// Wallet transaction history
pub const WALLET_TRANSACTION_HISTORY: &str = "/wallets/{wallet_id}/transaction_history";
/// Transfer between wallets
pub const TRANSFER: &str = "/transfer";

/// String map that keeps insertion order; inserting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.0.push((key.to_string(), value.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Values extracted from a matching path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMatch {
    /// Wildcard name to segment value
    pub wildcards: Params,
    /// Query string key to value; an empty value is kept as `""`
    pub query: Params,
}

/// Match `path` against `pattern`. Returns `None` when they do not match or
/// the query string is malformed.
pub fn match_path(path: &str, pattern: &str) -> Option<PathMatch> {
    let path_bytes = path.as_bytes();
    let pattern_bytes = pattern.as_bytes();
    let mut result = PathMatch::default();

    let mut i = 0; // path
    let mut j = 0; // pattern

    while i < path_bytes.len() && j < pattern_bytes.len() {
        if pattern_bytes[j] == b'{' {
            let name_end = j + 1 + find(&pattern_bytes[j + 1..], b'}')?;
            let name = &pattern[j + 1..name_end];

            let value_end = if path_bytes[i] == b'{' {
                let end = i + 1 + find(&path_bytes[i + 1..], b'}')?;
                let value = &path[i + 1..end];
                result.wildcards.insert(name, value);
                end + 1
            } else {
                // A bare segment runs up to the literal that follows the
                // wildcard in the pattern, or to the query string
                let stop = pattern_bytes.get(name_end + 1).copied();
                let len = path_bytes[i..]
                    .iter()
                    .position(|&b| Some(b) == stop || b == b'?' || b == b'/')
                    .unwrap_or(path_bytes.len() - i);
                if len == 0 {
                    return None;
                }
                result.wildcards.insert(name, &path[i..i + len]);
                i + len
            };

            i = value_end;
            j = name_end + 1;
            continue;
        }

        if path_bytes[i] != pattern_bytes[j] {
            return None;
        }
        i += 1;
        j += 1;
    }

    // Path shorter than pattern
    if j != pattern_bytes.len() {
        return None;
    }

    // Anything left must be a query string
    if i == path_bytes.len() {
        return Some(result);
    }
    if path_bytes[i] != b'?' {
        return None;
    }

    result.query = parse_query(&path[i + 1..])?;
    Some(result)
}

/// Parse `k1=v1&k2=v2`. A pair without `=` fails the whole query.
fn parse_query(query: &str) -> Option<Params> {
    let mut params = Params::default();
    if query.is_empty() {
        return Some(params);
    }

    let mut rest = query;
    loop {
        let eq = rest.find('=')?;
        let key = &rest[..eq];
        let after = &rest[eq + 1..];

        match after.find('&') {
            Some(amp) => {
                params.insert(key, &after[..amp]);
                rest = &after[amp + 1..];
                if rest.is_empty() {
                    break;
                }
            }
            None => {
                params.insert(key, after);
                break;
            }
        }
    }
    Some(params)
}

fn find(bytes: &[u8], needle: u8) -> Option<usize> {
    bytes.iter().position(|&b| b == needle)
}
