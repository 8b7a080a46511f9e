//! Named User-Agent identities.
//!
//! A small set of realistic browser and crawler identities selectable by
//! name from configuration. An unrecognized name is passed through as a
//! literal User-Agent value.

pub const CHROME: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/67.0.3396.99 Safari/537.36";

pub const FIREFOX: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_10; rv:33.0) \
                           Gecko/20100101 Firefox/33.0";

pub const OPERA: &str = "Opera/9.80 (X11; Linux i686; Ubuntu/14.10) \
                         Presto/2.12.388 Version/12.16";

pub const IE: &str = "Mozilla/5.0 (Windows NT 6.1; WOW64; Trident/7.0; AS; rv:11.0) \
                      like Gecko";

pub const SAFARI: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_13_6) \
                          AppleWebKit/605.1.15 (KHTML, like Gecko) \
                          Version/11.1.2 Safari/605.1.15";

pub const BAIDUBOT: &str = "Mozilla/5.0 (compatible; Baiduspider-render/2.0; \
                            +http://www.baidu.com/search/spider.html)";

pub const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; \
                             +http://www.google.com/bot.html)";

pub const BINGBOT: &str = "Mozilla/5.0 (compatible; bingbot/2.0; \
                           +http://www.bing.com/bingbot.htm)";

/// Resolve a configured identity to a full User-Agent string.
///
/// Known names map to their identity; anything else is taken as a literal
/// header value.
pub fn resolve(identity: &str) -> &str {
    match identity {
        "chrome" => CHROME,
        "firefox" => FIREFOX,
        "opera" => OPERA,
        "ie" => IE,
        "safari" => SAFARI,
        "baidubot" => BAIDUBOT,
        "googlebot" => GOOGLEBOT,
        "bingbot" => BINGBOT,
        literal => literal,
    }
}
