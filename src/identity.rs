//! Visitor identity and its compact token codec
//!
//! A [`VisitorIdentity`] is the durable per-visitor state: a random key the
//! assignment formula hashes on, plus which experiments the visitor has
//! seen and converted for. It round-trips through a pipe-delimited token:
//!
//! ```text
//! ID=482913|Tests=signup-button,header-color|Conversions=signup-button
//! ```
//!
//! The crate never touches the transport that carries the token (cookie,
//! header, whatever): callers decode on the way in, check
//! [`VisitorIdentity::is_dirty`] on the way out, and re-encode if needed.
//! Decoding is deliberately permissive - a visitor who mangles their token
//! simply starts over with a fresh identity.

use rand::Rng;

/// Durable per-visitor state, exclusively owned by the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitorIdentity {
    id: i64,
    tests_seen: Vec<String>,
    tests_converted: Vec<String>,
    dirty: bool,
}

impl VisitorIdentity {
    /// A fresh identity with a random id and no experiment history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: i64::from(rand::thread_rng().gen::<u32>()),
            tests_seen: Vec::new(),
            tests_converted: Vec::new(),
            dirty: false,
        }
    }

    /// Decode a token produced by [`Self::encode`].
    ///
    /// Unknown keys and malformed segments are ignored; a wholly malformed
    /// token yields a fresh identity rather than an error. Experiment name
    /// lists are trimmed, de-duplicated, and keep first-occurrence order.
    #[must_use]
    pub fn decode(token: &str) -> Self {
        let mut identity = Self::new();

        for segment in token.split('|') {
            if segment.is_empty() {
                continue;
            }
            let mut parts = segment.splitn(2, '=');
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };

            match key.trim().to_ascii_lowercase().as_str() {
                "id" => {
                    // keep the generated id when the field doesn't parse
                    if let Ok(id) = value.trim().parse::<i64>() {
                        identity.id = id;
                    }
                }
                "tests" => identity.tests_seen = parse_csv(value),
                "conversions" => identity.tests_converted = parse_csv(value),
                _ => {}
            }
        }

        identity
    }

    /// Encode this identity as its canonical token. Delimiter characters
    /// (`,`, `=`, `|`) inside experiment names are replaced with a space so
    /// the token always parses back.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "ID={}|Tests={}|Conversions={}",
            self.id,
            to_csv(&self.tests_seen),
            to_csv(&self.tests_converted),
        )
    }

    /// The visitor's assignment key.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Experiments this visitor has been counted as a participant of.
    #[must_use]
    pub fn tests_seen(&self) -> &[String] {
        &self.tests_seen
    }

    /// Experiments this visitor has converted for.
    #[must_use]
    pub fn tests_converted(&self) -> &[String] {
        &self.tests_converted
    }

    /// Whether this visitor has already been counted for `test_name`.
    #[must_use]
    pub fn has_seen(&self, test_name: &str) -> bool {
        self.tests_seen.iter().any(|t| t == test_name)
    }

    /// Whether this visitor has already converted for `test_name`.
    #[must_use]
    pub fn has_converted(&self, test_name: &str) -> bool {
        self.tests_converted.iter().any(|t| t == test_name)
    }

    /// Record that this visitor was counted for `test_name`. Sets the dirty
    /// flag only when the state actually changed.
    pub fn mark_seen(&mut self, test_name: &str) {
        if !self.has_seen(test_name) {
            self.tests_seen.push(test_name.to_string());
            self.dirty = true;
        }
    }

    /// Record that this visitor converted for `test_name`. Sets the dirty
    /// flag only when the state actually changed.
    pub fn mark_converted(&mut self, test_name: &str) {
        if !self.has_converted(test_name) {
            self.tests_converted.push(test_name.to_string());
            self.dirty = true;
        }
    }

    /// Whether the identity changed since it was decoded and should be
    /// written back to its carrier.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[cfg(test)]
    pub(crate) fn with_id(id: i64) -> Self {
        Self {
            id,
            tests_seen: Vec::new(),
            tests_converted: Vec::new(),
            dirty: false,
        }
    }
}

impl Default for VisitorIdentity {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_csv(csv: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for token in csv.split(',') {
        let value = token.trim();
        if !value.is_empty() && !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }
    values
}

fn to_csv(values: &[String]) -> String {
    values
        .iter()
        .map(|v| v.replace([',', '=', '|'], " "))
        .collect::<Vec<_>>()
        .join(",")
}
