//! User-Agent device classification for UI variant selection.
//!
//! Stateless keyword heuristic over the raw header value. When a phone
//! user enables "Request Desktop Site" the browser sends a desktop UA
//! string, so that case falls out as `Desktop` with no special handling.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceClass {
    /// Mobile and tablet both get the handheld UI variant.
    pub fn is_handheld(self) -> bool {
        !matches!(self, DeviceClass::Desktop)
    }
}

pub fn classify_user_agent(user_agent: &str) -> DeviceClass {
    let ua = user_agent.to_ascii_lowercase();

    let android = ua.contains("android");
    let android_mobile = android && ua.contains("mobile");

    if ua.contains("ipad")
        || ua.contains("tablet")
        || ua.contains("kindle")
        || ua.contains("silk/")
        || (android && !android_mobile)
    {
        return DeviceClass::Tablet;
    }

    if android_mobile
        || ua.contains("iphone")
        || ua.contains("ipod")
        || ua.contains("windows phone")
        || ua.contains("blackberry")
        || ua.contains("opera mini")
        || ua.contains("mobi")
    {
        return DeviceClass::Mobile;
    }

    DeviceClass::Desktop
}
