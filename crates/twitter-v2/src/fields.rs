//! Field-selection and expansion names accepted by the v2 endpoints.

use std::fmt;
use std::str::FromStr;

use crate::error::TwitterError;

macro_rules! field_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($variant:ident => $wire:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $(
                #[doc = concat!("`", $wire, "`")]
                $variant,
            )+
        }

        impl $name {
            /// Every value, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Name used on the wire.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TwitterError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(TwitterError::Config(format!(
                        concat!("unknown ", $label, ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

field_enum! {
    /// Objects to expand inline under `includes`.
    Expansion, "expansion" {
        AttachmentsPollIds => "attachments.poll_ids",
        AttachmentsMediaKeys => "attachments.media_keys",
        AuthorId => "author_id",
        EditHistoryTweetIds => "edit_history_tweet_ids",
        EntitiesMentionsUsername => "entities.mentions.username",
        GeoPlaceId => "geo.place_id",
        InReplyToUserId => "in_reply_to_user_id",
        ReferencedTweetsId => "referenced_tweets.id",
        ReferencedTweetsIdAuthorId => "referenced_tweets.id.author_id",
        PinnedTweetId => "pinned_tweet_id",
    }
}

field_enum! {
    /// Tweet fields selectable with `tweet.fields`.
    TweetField, "tweet field" {
        Attachments => "attachments",
        AuthorId => "author_id",
        ContextAnnotations => "context_annotations",
        ConversationId => "conversation_id",
        CreatedAt => "created_at",
        EditControls => "edit_controls",
        EditHistoryTweetIds => "edit_history_tweet_ids",
        Entities => "entities",
        Geo => "geo",
        Id => "id",
        InReplyToUserId => "in_reply_to_user_id",
        Lang => "lang",
        PossiblySensitive => "possibly_sensitive",
        PublicMetrics => "public_metrics",
        ReferencedTweets => "referenced_tweets",
        ReplySettings => "reply_settings",
        Source => "source",
        Text => "text",
        Withheld => "withheld",
    }
}

field_enum! {
    /// User fields selectable with `user.fields`.
    UserField, "user field" {
        CreatedAt => "created_at",
        Description => "description",
        Entities => "entities",
        Id => "id",
        Location => "location",
        Name => "name",
        PinnedTweetId => "pinned_tweet_id",
        ProfileImageUrl => "profile_image_url",
        Protected => "protected",
        PublicMetrics => "public_metrics",
        Url => "url",
        Username => "username",
        Verified => "verified",
        VerifiedType => "verified_type",
        Withheld => "withheld",
    }
}

field_enum! {
    /// Media fields selectable with `media.fields`.
    MediaField, "media field" {
        AltText => "alt_text",
        DurationMs => "duration_ms",
        Height => "height",
        MediaKey => "media_key",
        PreviewImageUrl => "preview_image_url",
        PublicMetrics => "public_metrics",
        Type => "type",
        Url => "url",
        Variants => "variants",
        Width => "width",
    }
}

field_enum! {
    /// Place fields selectable with `place.fields`.
    PlaceField, "place field" {
        ContainedWithin => "contained_within",
        Country => "country",
        CountryCode => "country_code",
        FullName => "full_name",
        Geo => "geo",
        Id => "id",
        Name => "name",
        PlaceType => "place_type",
    }
}

field_enum! {
    /// Poll fields selectable with `poll.fields`.
    PollField, "poll field" {
        DurationMinutes => "duration_minutes",
        EndDatetime => "end_datetime",
        Id => "id",
        Options => "options",
        VotingStatus => "voting_status",
    }
}

/// Join field names with commas, the v2 list syntax.
pub(crate) fn join<T: Copy + fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a comma-separated list produced by [`join`].
pub(crate) fn split<T: FromStr<Err = TwitterError>>(value: &str) -> Result<Vec<T>, TwitterError> {
    value
        .split(',')
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_parse_back() {
        for field in TweetField::ALL {
            assert_eq!(field.as_str().parse::<TweetField>().unwrap(), *field);
        }
        for expansion in Expansion::ALL {
            assert_eq!(expansion.to_string().parse::<Expansion>().unwrap(), *expansion);
        }
    }

    #[test]
    fn test_unknown_name_is_config_error() {
        let err = "favourites".parse::<TweetField>().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("tweet field"));
    }

    #[test]
    fn test_join_and_split() {
        let joined = join(&[UserField::Id, UserField::Username]);
        assert_eq!(joined, "id,username");
        assert_eq!(
            split::<UserField>(&joined).unwrap(),
            vec![UserField::Id, UserField::Username]
        );
        assert!(split::<UserField>("").unwrap().is_empty());
    }
}
