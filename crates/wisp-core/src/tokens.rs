//! Token dictionaries and packed-string alphabets.
//!
//! The wire format compresses well-known strings to one byte (single-byte
//! dictionary) or two bytes (four double-byte dictionary pages selected by
//! tag). Numeric and hexadecimal strings are packed two digits per byte
//! using the alphabets at the bottom of this file.

/// Empty list / null value.
pub const LIST_EMPTY: u8 = 0;
/// Stream end marker.
pub const STREAM_END: u8 = 2;
/// First double-byte dictionary page.
pub const DICTIONARY_0: u8 = 236;
/// Second double-byte dictionary page.
pub const DICTIONARY_1: u8 = 237;
/// Third double-byte dictionary page.
pub const DICTIONARY_2: u8 = 238;
/// Fourth double-byte dictionary page.
pub const DICTIONARY_3: u8 = 239;
/// Companion jid (agent + device + user).
pub const COMPANION_JID: u8 = 247;
/// List with 8-bit length prefix.
pub const LIST_8: u8 = 248;
/// List with 16-bit length prefix.
pub const LIST_16: u8 = 249;
/// User/server jid pair.
pub const JID_PAIR: u8 = 250;
/// Hex string packed two digits per byte.
pub const HEX_8: u8 = 251;
/// Raw bytes with 8-bit length.
pub const BINARY_8: u8 = 252;
/// Raw bytes with 20-bit length.
pub const BINARY_20: u8 = 253;
/// Raw bytes with 16-bit length.
pub const BINARY_32: u8 = 254;
/// Numeric string packed two digits per byte.
pub const NIBBLE_8: u8 = 255;

/// Longest string representable by nibble or hex packing (7-bit length).
pub const PACKED_MAX: usize = 127;

/// Single-byte dictionary, indexed by `token - 1`.
///
/// Tokens inside `DICTIONARY_0..=DICTIONARY_3` never reach this table; the
/// slots at those indices are placeholders and unreachable.
pub const SINGLE_BYTE: &[&str] = &[
    "xmlstreamstart",
    "xmlstreamend",
    "s.whatsapp.net",
    "type",
    "participant",
    "from",
    "receipt",
    "id",
    "notification",
    "disappearing_mode",
    "status",
    "jid",
    "broadcast",
    "user",
    "devices",
    "device_hash",
    "to",
    "offline",
    "message",
    "result",
    "class",
    "xmlns",
    "duplicate",
    "release",
    "error",
    "encrypt",
    "notify",
    "presence",
    "config",
    "picture",
    "verified_name",
    "contact",
    "available",
    "count",
    "iq",
    "enc",
    "t",
    "ack",
    "g.us",
    "urn:xmpp:whatsapp:push",
    "device",
    "text",
    "fail",
    "success",
    "media",
    "notice",
    "urn:xmpp:whatsapp",
    "query",
    "remove",
    "state",
    "last",
    "value",
    "media_conn",
    "dirty",
    "w:profile:picture",
    "1",
    "unavailable",
    "business",
    "set",
    "creation",
    "location",
    "get",
    "fallback_hostname",
    "0",
    "chatstate",
    "composing",
    "item",
    "category",
    "fallback_ip4",
    "add",
    "w:p",
    "list",
    "usync",
    "urn:xmpp:ping",
    "fallback_ip6",
    "hostname",
    "2",
    "call-creator",
    "unknown",
    "delivery",
    "device-list",
    "uploadhost",
    "groups",
    "name",
    "resource",
    "deny",
    "read",
    "Replaced by a new device",
    "active",
    "fallback_class",
    "index",
    "internal-server-error",
    "contacts",
    "refresh",
    "primary",
    "w:gp2",
    "signature",
    "status-revoke-delay",
    "3",
    "relaylatency",
    "mediaretry",
    "default",
    "ip4",
    "config_value",
    "invite",
    "ip6",
    "platform",
    "version",
    "te2",
    "mode",
    "config_code",
    "alt_jid",
    "identity",
    "item-not-found",
    "key",
    "w:stats",
    "retry",
    "priority",
    "profile",
    "mexp",
    "subject",
    "w:mex",
    "code",
    "reason",
    "sync",
    "te",
    "status_old",
    "url",
    "4",
    "w:sync:app:state",
    "edge_routing",
    "routing_info",
    "5",
    "expiration",
    "msg",
    "chat",
    "paused",
    "direct_path",
    "stream:error",
    "mmg.whatsapp.net",
    "props",
    "key-index-list",
    "background",
    "keys",
    "prop",
    "side_list",
    "update",
    "registration",
    "voip_settings",
    "w:m",
    "account_sync",
    "context",
    "6",
    "device-identity",
    "encopt",
    "tctoken",
    "appdata",
    "call-id",
    "7",
    "preview",
    "w:biz",
    "collection",
    "9",
    "patch",
    "expected_ts",
    "8",
    "member_since_text",
    "outgoing",
    "audio",
    "video",
    "image",
    "document",
    "sticker",
    "peer_abtest_bucket",
    "multicast",
    "offer",
    "group",
    "latency",
    "blocklist",
    "privacy",
    "w:b",
    "recipient",
    "tag",
    "categories",
    "order",
    "invis",
    "recording",
    "10",
    "pkmsg",
    "skmsg",
    "native_flow_name",
    "account",
    "canonical",
    "encrypt_keys",
    "web",
    "fallback",
    "verified_level",
    "media_id",
    "low",
    "high",
    "photo",
    "language",
    "pn",
    "lid",
    "token_id",
    "sender_index",
    "timestamp",
    "unavailable-error",
    "smax_id",
    "stream_id",
    "served",
    "not-authorized",
    "call",
    "biz_cover_photo",
    "phash",
    "usync_context",
    "decrypt-fail",
    "phone",
    "proto",
    "mobile",
];

/// Double-byte dictionary: four pages of `SINGLE_BYTE`-style tokens.
///
/// The page is selected by `tag - DICTIONARY_0`; the byte after the tag
/// indexes within the page. Page size is `DOUBLE_BYTE.len() / 4`.
pub const DOUBLE_BYTE: &[&str] = &[
    // page 0
    "media-gig2-1.cdn.whatsapp.net",
    "media-gig2-2.cdn.whatsapp.net",
    "media-arn2-1.cdn.whatsapp.net",
    "media-bog1-1.cdn.whatsapp.net",
    "media-bom1-1.cdn.whatsapp.net",
    "media-bom1-2.cdn.whatsapp.net",
    "media-cdg2-1.cdn.whatsapp.net",
    "media-cdt1-1.cdn.whatsapp.net",
    "media-cgk1-1.cdn.whatsapp.net",
    "media-cgk1-2.cdn.whatsapp.net",
    "media-cph2-1.cdn.whatsapp.net",
    "media-dfw5-1.cdn.whatsapp.net",
    "media-dfw5-2.cdn.whatsapp.net",
    "media-dus1-1.cdn.whatsapp.net",
    "media-eze1-1.cdn.whatsapp.net",
    "media-fra3-1.cdn.whatsapp.net",
    "media-fra3-2.cdn.whatsapp.net",
    "media-gru2-1.cdn.whatsapp.net",
    "media-gua1-1.cdn.whatsapp.net",
    "media-hbe1-1.cdn.whatsapp.net",
    "media-hel3-1.cdn.whatsapp.net",
    "media-hkg4-1.cdn.whatsapp.net",
    "media-hkg4-2.cdn.whatsapp.net",
    "media-iad3-1.cdn.whatsapp.net",
    "media-iad3-2.cdn.whatsapp.net",
    "media-jnb1-1.cdn.whatsapp.net",
    "media-kul2-1.cdn.whatsapp.net",
    "media-kul3-1.cdn.whatsapp.net",
    "media-lax3-1.cdn.whatsapp.net",
    "media-lga3-1.cdn.whatsapp.net",
    "media-lhr8-1.cdn.whatsapp.net",
    "media-lim1-1.cdn.whatsapp.net",
    "media-los2-1.cdn.whatsapp.net",
    "media-mad1-1.cdn.whatsapp.net",
    "media-mba1-1.cdn.whatsapp.net",
    "media-mct1-1.cdn.whatsapp.net",
    "media-mxp1-1.cdn.whatsapp.net",
    "media-ort2-1.cdn.whatsapp.net",
    "media-otp1-1.cdn.whatsapp.net",
    "media-pmo1-1.cdn.whatsapp.net",
    "media-qro1-1.cdn.whatsapp.net",
    "media-scl2-1.cdn.whatsapp.net",
    "media-sin6-1.cdn.whatsapp.net",
    "media-sin6-2.cdn.whatsapp.net",
    "media-sin6-3.cdn.whatsapp.net",
    "media-sof1-1.cdn.whatsapp.net",
    "media-syd2-1.cdn.whatsapp.net",
    "media-tir2-1.cdn.whatsapp.net",
    "media-vie1-1.cdn.whatsapp.net",
    "media-waw1-1.cdn.whatsapp.net",
    "media-xsp1-1.cdn.whatsapp.net",
    "media-zrh1-1.cdn.whatsapp.net",
    "media.fada1-1.fna.whatsapp.net",
    "media.fada1-2.fna.whatsapp.net",
    "media.fdet1-1.fna.whatsapp.net",
    "media.fgbb1-1.fna.whatsapp.net",
    "media.fist2-1.fna.whatsapp.net",
    "media.fist7-1.fna.whatsapp.net",
    "media.fjed4-1.fna.whatsapp.net",
    "media.fjed4-2.fna.whatsapp.net",
    "media.fkhi5-1.fna.whatsapp.net",
    "media.flhe4-1.fna.whatsapp.net",
    "media.flos5-1.fna.whatsapp.net",
    "media.fmex3-1.fna.whatsapp.net",
    // page 1
    "apparent",
    "clean",
    "ctwa",
    "ephemeral",
    "disable",
    "w:comms:chat",
    "fb_page",
    "delete",
    "remote",
    "limit",
    "report",
    "abt",
    "thread",
    "linked_accounts",
    "ig_professional",
    "fb_downstream",
    "request",
    "deleted",
    "email",
    "address",
    "latitude",
    "longitude",
    "commerce_experience",
    "description",
    "website",
    "catalog_status",
    "shop_url",
    "is_new_user",
    "serial",
    "host",
    "cart_enabled",
    "direct_connection",
    "automated_type",
    "prompts",
    "audio_duration",
    "transcript",
    "enabled",
    "attribute_padding",
    "privacy_mode_ts",
    "privacy_token",
    "dhash",
    "original_dimensions",
    "original_image_url",
    "request_image_url",
    "reply",
    "trusted_contact",
    "tumbstoned",
    "two_fac",
    "ver",
    "verify_app",
    "verify_email",
    "vname",
    "revoke_delay",
    "history",
    "in",
    "out",
    "fts_version",
    "membership_approval_mode",
    "member_add_mode",
    "admin",
    "superadmin",
    "promote",
    "demote",
    "not_ephemeral",
    // page 2
    "1080p",
    "720p",
    "480p",
    "360p",
    "shops",
    "cover_photo",
    "newsletter",
    "newsletters",
    "mute",
    "unmute",
    "follow",
    "unfollow",
    "w:channel",
    "subscribers",
    "reaction_codes",
    "handler",
    "metadata",
    "messages_count",
    "verification",
    "linked_parent",
    "membership",
    "suspended",
    "geosuspended",
    "terms_violation",
    "creation_time",
    "invite_link",
    "admin_count",
    "mini_version",
    "full_version",
    "tos",
    "accepted",
    "optional",
    "stage",
    "interactive",
    "buttons",
    "list_response",
    "template",
    "carousel",
    "payment",
    "payment_info",
    "payment_status",
    "transaction",
    "currency",
    "amount",
    "offset",
    "nonce",
    "receiver",
    "sender",
    "session",
    "keystore",
    "attestation",
    "integrity",
    "token_request",
    "challenge",
    "solution",
    "backoff",
    "throttle",
    "quota",
    "window",
    "bucket",
    "experiment",
    "segment",
    "holdout",
    "exposure",
    // page 3
    "fbid",
    "fb:multiway",
    "audio_frame",
    "video_frame",
    "relay_election",
    "relay_candidate",
    "transport_message",
    "candidate_pair",
    "srtp",
    "dtls",
    "ice",
    "offer_ack",
    "terminate",
    "reject",
    "busy",
    "timeout",
    "ringing",
    "pre_accept",
    "accept_ack",
    "group_call",
    "joinable",
    "participants",
    "mute_state",
    "screen_share",
    "viewer",
    "presenter",
    "camera",
    "microphone",
    "speaker",
    "battery",
    "net_medium",
    "bitrate",
    "jitter",
    "packet_loss",
    "rtt",
    "codec",
    "opus",
    "vp8",
    "vp9",
    "h264",
    "resolution",
    "framerate",
    "keyframe",
    "renegotiation",
    "downgrade",
    "upgrade",
    "lonely",
    "quality_shift",
    "bandwidth_estimate",
    "probe",
    "padding_bytes",
    "stats_interval",
    "call_log",
    "missed",
    "voicemail",
    "callback",
    "srtcp",
    "crypto_suite",
    "master_key",
    "key_param",
    "transport_cc",
    "remb",
    "nack",
    "pli",
];

/// Page size of the double-byte dictionary.
pub const DOUBLE_BYTE_PAGE: usize = DOUBLE_BYTE.len() / 4;

/// Alphabet for nibble-packed numeric strings.
pub const NUMBERS: &[u8] = b"0123456789-.";

/// Alphabet for hex-packed strings.
pub const HEX: &[u8] = b"0123456789ABCDEF";

/// Look up a single-byte token.
pub fn single_byte(token: u8) -> Option<&'static str> {
    let index = (token as usize).checked_sub(1)?;
    SINGLE_BYTE.get(index).copied()
}

/// Look up a double-byte token by dictionary page and index within it.
pub fn double_byte(page: u8, index: u8) -> Option<&'static str> {
    if index as usize >= DOUBLE_BYTE_PAGE {
        return None;
    }
    DOUBLE_BYTE.get(DOUBLE_BYTE_PAGE * page as usize + index as usize).copied()
}

/// Find the single-byte token for a string, if any.
pub fn find_single_byte(value: &str) -> Option<u8> {
    SINGLE_BYTE
        .iter()
        .position(|&token| token == value)
        .map(|index| (index + 1) as u8)
}

/// Find the (page, index) double-byte coordinates for a string, if any.
pub fn find_double_byte(value: &str) -> Option<(u8, u8)> {
    DOUBLE_BYTE.iter().position(|&token| token == value).map(|index| {
        ((index / DOUBLE_BYTE_PAGE) as u8, (index % DOUBLE_BYTE_PAGE) as u8)
    })
}
