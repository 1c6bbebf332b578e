//! Discovery metadata embedded in the page head for frame-hosting clients.

use serde::{Deserialize, Serialize};
use url::Url;

pub const MINIAPP_META_NAME: &str = "fc:miniapp";
pub const LEGACY_FRAME_META_NAME: &str = "fc:frame";
pub const ACTION_PATH: &str = "/api/action";
pub const SPLASH_PATH: &str = "/splash.png";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniAppDescriptor {
    pub version: String,
    pub image_url: String,
    pub button: MiniAppButton,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniAppButton {
    pub title: String,
    pub action: MiniAppAction,
    pub name: String,
    pub splash_image_url: String,
    pub splash_background_color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniAppAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyFrameDescriptor {
    pub version: String,
    pub image: String,
    #[serde(rename = "button:1")]
    pub button_1: String,
    pub action_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMetadata {
    pub miniapp: MiniAppDescriptor,
    pub legacy: LegacyFrameDescriptor,
}

impl FrameMetadata {
    pub fn for_site(site_url: &Url, app_name: &str) -> Self {
        let site = site_url.as_str().trim_end_matches('/');
        let splash = format!("{site}{SPLASH_PATH}");
        let button_title = format!("Open {app_name}");

        Self {
            miniapp: MiniAppDescriptor {
                version: "1".to_string(),
                image_url: splash.clone(),
                button: MiniAppButton {
                    title: button_title.clone(),
                    action: MiniAppAction {
                        kind: "launch_frame".to_string(),
                        url: site.to_string(),
                    },
                    name: app_name.to_string(),
                    splash_image_url: splash.clone(),
                    splash_background_color: "#ffffff".to_string(),
                },
            },
            legacy: LegacyFrameDescriptor {
                version: "vNext".to_string(),
                image: splash,
                button_1: button_title,
                action_url: format!("{site}{ACTION_PATH}"),
            },
        }
    }
}
