//! Options arguments for endpoint calls and their query-string encoding.
//!
//! Every endpoint accepts a slice of options arguments and rejects more than
//! one with a configuration error before any network activity.

use reqwest::Url;

use crate::{
    error::{TwitterError, TwitterResult},
    fields::{self, Expansion, MediaField, PlaceField, PollField, TweetField, UserField},
};

/// Return the single options argument, if one was supplied.
pub fn single_options<'a, T>(api: &str, opts: &'a [T]) -> TwitterResult<Option<&'a T>> {
    match opts {
        [] => Ok(None),
        [one] => Ok(Some(one)),
        _ => Err(TwitterError::Config(format!(
            "{api}: at most one options argument is allowed, got {}",
            opts.len()
        ))),
    }
}

/// Expansions and per-object field selections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelection {
    pub expansions: Vec<Expansion>,
    pub tweet_fields: Vec<TweetField>,
    pub user_fields: Vec<UserField>,
    pub media_fields: Vec<MediaField>,
    pub place_fields: Vec<PlaceField>,
    pub poll_fields: Vec<PollField>,
}

fn dedup<T: Copy + PartialEq>(values: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

/// Append `more` to `values`, keeping first occurrences only.
fn merge<T: Copy + PartialEq>(values: &mut Vec<T>, more: Vec<T>) {
    let merged = dedup(values.iter().copied().chain(more));
    *values = merged;
}

impl FieldSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn expansions(mut self, values: impl IntoIterator<Item = Expansion>) -> Self {
        self.expansions = dedup(values);
        self
    }

    #[must_use]
    pub fn tweet_fields(mut self, values: impl IntoIterator<Item = TweetField>) -> Self {
        self.tweet_fields = dedup(values);
        self
    }

    #[must_use]
    pub fn user_fields(mut self, values: impl IntoIterator<Item = UserField>) -> Self {
        self.user_fields = dedup(values);
        self
    }

    #[must_use]
    pub fn media_fields(mut self, values: impl IntoIterator<Item = MediaField>) -> Self {
        self.media_fields = dedup(values);
        self
    }

    #[must_use]
    pub fn place_fields(mut self, values: impl IntoIterator<Item = PlaceField>) -> Self {
        self.place_fields = dedup(values);
        self
    }

    #[must_use]
    pub fn poll_fields(mut self, values: impl IntoIterator<Item = PollField>) -> Self {
        self.poll_fields = dedup(values);
        self
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expansions.is_empty()
            && self.tweet_fields.is_empty()
            && self.user_fields.is_empty()
            && self.media_fields.is_empty()
            && self.place_fields.is_empty()
            && self.poll_fields.is_empty()
    }

    /// Query parameters for this selection; empty sets are omitted.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_list(&mut pairs, "expansions", &dedup(self.expansions.iter().copied()));
        push_list(&mut pairs, "tweet.fields", &dedup(self.tweet_fields.iter().copied()));
        push_list(&mut pairs, "user.fields", &dedup(self.user_fields.iter().copied()));
        push_list(&mut pairs, "media.fields", &dedup(self.media_fields.iter().copied()));
        push_list(&mut pairs, "place.fields", &dedup(self.place_fields.iter().copied()));
        push_list(&mut pairs, "poll.fields", &dedup(self.poll_fields.iter().copied()));
        pairs
    }

    /// Apply one query parameter; returns `false` for keys this type does not own.
    /// A repeated key adds to the values already parsed.
    fn apply_pair(&mut self, key: &str, value: &str) -> TwitterResult<bool> {
        match key {
            "expansions" => merge(&mut self.expansions, fields::split(value)?),
            "tweet.fields" => merge(&mut self.tweet_fields, fields::split(value)?),
            "user.fields" => merge(&mut self.user_fields, fields::split(value)?),
            "media.fields" => merge(&mut self.media_fields, fields::split(value)?),
            "place.fields" => merge(&mut self.place_fields, fields::split(value)?),
            "poll.fields" => merge(&mut self.poll_fields, fields::split(value)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Parse a query string produced by [`FieldSelection::query_pairs`].
    pub fn from_query(query: &str) -> TwitterResult<Self> {
        let mut selection = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if !selection.apply_pair(&key, &value)? {
                return Err(TwitterError::Config(format!("unknown query parameter: {key}")));
            }
        }
        Ok(selection)
    }
}

fn push_list<T: Copy + std::fmt::Display>(
    pairs: &mut Vec<(&'static str, String)>,
    key: &'static str,
    values: &[T],
) {
    if !values.is_empty() {
        pairs.push((key, fields::join(values)));
    }
}

/// Options argument for the streaming endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOptions {
    pub fields: FieldSelection,

    /// Minutes of missed events to replay on connect (1-5)
    pub backfill_minutes: Option<u32>,
}

impl StreamOptions {
    #[must_use]
    pub fn new(fields: FieldSelection) -> Self {
        Self {
            fields,
            backfill_minutes: None,
        }
    }

    #[must_use]
    pub const fn backfill_minutes(mut self, minutes: u32) -> Self {
        self.backfill_minutes = Some(minutes);
        self
    }

    /// Query parameters for this options argument.
    pub fn query_pairs(&self) -> TwitterResult<Vec<(&'static str, String)>> {
        let mut pairs = self.fields.query_pairs();
        if let Some(minutes) = self.backfill_minutes {
            if !(1..=5).contains(&minutes) {
                return Err(TwitterError::Config(format!(
                    "backfill_minutes must be between 1 and 5, got {minutes}"
                )));
            }
            pairs.push(("backfill_minutes", minutes.to_string()));
        }
        Ok(pairs)
    }

    /// Parse a query string produced by [`StreamOptions::query_pairs`].
    pub fn from_query(query: &str) -> TwitterResult<Self> {
        let mut options = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key == "backfill_minutes" {
                if options.backfill_minutes.is_some() {
                    return Err(TwitterError::Config(
                        "backfill_minutes given more than once".into(),
                    ));
                }
                let minutes = value.parse().map_err(|_| {
                    TwitterError::Config(format!("invalid backfill_minutes: {value}"))
                })?;
                options.backfill_minutes = Some(minutes);
            } else if !options.fields.apply_pair(&key, &value)? {
                return Err(TwitterError::Config(format!("unknown query parameter: {key}")));
            }
        }
        Ok(options)
    }
}

/// Append `pairs` to the URL's query string.
pub(crate) fn append_query(url: &mut Url, pairs: &[(&'static str, String)]) {
    if pairs.is_empty() {
        return;
    }
    let mut query = url.query_pairs_mut();
    for (key, value) in pairs {
        query.append_pair(key, value);
    }
}
