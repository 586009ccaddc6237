//! Command target table.
//!
//! Maps logical method names (as exposed over the HTTP gateway) to SSAP
//! or Luna service URIs. Luna endpoints are not directly callable from
//! an external client; the connection layer routes them through the
//! alert hack (see [`crate::alert`]).

use serde::{Deserialize, Serialize};

/// Protocol scheme of a command target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Public TV API, callable directly.
    Ssap,
    /// Internal bus, reachable only via the alert hack.
    Luna,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Ssap => "ssap",
            Scheme::Luna => "luna",
        }
    }
}

/// A resolvable command target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub scheme: Scheme,
    pub uri: &'static str,
}

impl Target {
    /// Full wire URI, e.g. `ssap://system.launcher/launch`.
    pub fn to_uri(&self) -> String {
        format!("{}://{}", self.scheme.as_str(), self.uri)
    }
}

/// Alert creation endpoint used by the Luna workaround.
pub const CREATE_ALERT: Target = Target {
    scheme: Scheme::Ssap,
    uri: "system.notifications/createAlert",
};

/// Alert dismissal endpoint, answered automatically by the connection layer.
pub const CLOSE_ALERT: Target = Target {
    scheme: Scheme::Ssap,
    uri: "system.notifications/closeAlert",
};

/// Looks up a logical method name.
///
/// Returns `None` for unknown methods; the gateway turns that into a 404.
pub fn resolve(method: &str) -> Option<Target> {
    let target = match method {
        // Power
        "turn_off" => Target {
            scheme: Scheme::Ssap,
            uri: "system/turnOff",
        },
        "screen_off" => Target {
            scheme: Scheme::Luna,
            uri: "com.webos.service.tvpower/power/turnOffScreen",
        },
        "screen_on" => Target {
            scheme: Scheme::Luna,
            uri: "com.webos.service.tvpower/power/turnOnScreen",
        },

        // Apps
        "launch" => Target {
            scheme: Scheme::Ssap,
            uri: "system.launcher/launch",
        },
        "close_app" => Target {
            scheme: Scheme::Ssap,
            uri: "system.launcher/close",
        },
        "open_url" => Target {
            scheme: Scheme::Ssap,
            uri: "system.launcher/open",
        },
        "foreground_app" => Target {
            scheme: Scheme::Ssap,
            uri: "com.webos.applicationManager/getForegroundAppInfo",
        },

        // Audio
        "volume_up" => Target {
            scheme: Scheme::Ssap,
            uri: "audio/volumeUp",
        },
        "volume_down" => Target {
            scheme: Scheme::Ssap,
            uri: "audio/volumeDown",
        },
        "set_volume" => Target {
            scheme: Scheme::Ssap,
            uri: "audio/setVolume",
        },
        "get_volume" => Target {
            scheme: Scheme::Ssap,
            uri: "audio/getVolume",
        },
        "set_mute" => Target {
            scheme: Scheme::Ssap,
            uri: "audio/setMute",
        },

        // Media
        "play" => Target {
            scheme: Scheme::Ssap,
            uri: "media.controls/play",
        },
        "pause" => Target {
            scheme: Scheme::Ssap,
            uri: "media.controls/pause",
        },
        "stop" => Target {
            scheme: Scheme::Ssap,
            uri: "media.controls/stop",
        },
        "rewind" => Target {
            scheme: Scheme::Ssap,
            uri: "media.controls/rewind",
        },
        "fast_forward" => Target {
            scheme: Scheme::Ssap,
            uri: "media.controls/fastForward",
        },

        // TV
        "channel_up" => Target {
            scheme: Scheme::Ssap,
            uri: "tv/channelUp",
        },
        "channel_down" => Target {
            scheme: Scheme::Ssap,
            uri: "tv/channelDown",
        },
        "set_channel" => Target {
            scheme: Scheme::Ssap,
            uri: "tv/openChannel",
        },
        "switch_input" => Target {
            scheme: Scheme::Ssap,
            uri: "tv/switchInput",
        },

        // Notifications
        "notification" => Target {
            scheme: Scheme::Ssap,
            uri: "system.notifications/createToast",
        },
        "create_alert" => CREATE_ALERT,
        "close_alert" => CLOSE_ALERT,

        // Settings (internal bus)
        "set_system_settings" => Target {
            scheme: Scheme::Luna,
            uri: "com.webos.settingsservice/setSystemSettings",
        },
        "set_device_info" => Target {
            scheme: Scheme::Luna,
            uri: "com.webos.service.eim/setDeviceInfo",
        },

        _ => return None,
    };
    Some(target)
}
