//! Key layout of the single brand-partitioned table.
//!
//! Every record lives in partition `brand#<brand>`; the sort-key prefix
//! tells the record families apart. Identifiers must not contain `#`.

pub const BRAND_PREFIX: &str = "brand#";
pub const CAMPAIGN_PREFIX: &str = "campaign#";
pub const PRODUCT_GROUP_PREFIX: &str = "product-group#";
pub const LANDING_PAGE_PREFIX: &str = "landing-page#";
pub const PRODUCT_GROUP_LINK_PREFIX: &str = "campaign-product-group#";
pub const LANDING_PAGE_LINK_PREFIX: &str = "campaign-landing-page#";
pub const DISPLAY_PAGE_PREFIX: &str = "display-page#";
pub const CAMPAIGN_EVENT_PREFIX: &str = "campaign-event#";

const PRODUCT_SEGMENT: &str = "#product#";
const CAMPAIGN_SEGMENT: &str = "#campaign#";

pub fn brand_partition(brand_id: &str) -> String {
    format!("{BRAND_PREFIX}{brand_id}")
}

pub fn brand_sort_key(brand_id: &str) -> String {
    format!("{BRAND_PREFIX}{brand_id}")
}

pub fn campaign_sort_key(campaign_id: &str) -> String {
    format!("{CAMPAIGN_PREFIX}{campaign_id}")
}

pub fn product_group_sort_key(product_group_id: &str) -> String {
    format!("{PRODUCT_GROUP_PREFIX}{product_group_id}")
}

pub fn landing_page_sort_key(landing_page_id: &str) -> String {
    format!("{LANDING_PAGE_PREFIX}{landing_page_id}")
}

/// Prefix shared by all membership records of one product group
pub fn group_members_prefix(product_group_id: &str) -> String {
    format!("{PRODUCT_GROUP_PREFIX}{product_group_id}{PRODUCT_SEGMENT}")
}

pub fn membership_sort_key(product_group_id: &str, product_id: &str) -> String {
    format!("{}{product_id}", group_members_prefix(product_group_id))
}

pub fn product_group_link_sort_key(
    product_group_id: &str,
    campaign_id: &str,
) -> String {
    format!(
        "{PRODUCT_GROUP_LINK_PREFIX}{product_group_id}{CAMPAIGN_SEGMENT}{campaign_id}"
    )
}

pub fn landing_page_link_sort_key(
    landing_page_id: &str,
    campaign_id: &str,
) -> String {
    format!(
        "{LANDING_PAGE_LINK_PREFIX}{landing_page_id}{CAMPAIGN_SEGMENT}{campaign_id}"
    )
}

pub fn display_page_sort_key(product_id: &str, window_id: &str) -> String {
    format!("{DISPLAY_PAGE_PREFIX}{product_id}#{window_id}")
}

/// Prefix shared by all display pages of one product
pub fn product_display_pages_prefix(product_id: &str) -> String {
    format!("{DISPLAY_PAGE_PREFIX}{product_id}#")
}

pub fn campaign_events_prefix(campaign_id: &str) -> String {
    format!("{CAMPAIGN_EVENT_PREFIX}{campaign_id}#")
}

fn single_id<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let id = key.strip_prefix(prefix)?;
    (!id.is_empty() && !id.contains('#')).then_some(id)
}

fn id_pair<'a>(
    key: &'a str,
    prefix: &str,
    segment: &str,
) -> Option<(&'a str, &'a str)> {
    let rest = key.strip_prefix(prefix)?;
    let (first, second) = rest.split_once(segment)?;
    let valid = |s: &str| !s.is_empty() && !s.contains('#');
    (valid(first) && valid(second)).then_some((first, second))
}

pub fn parse_brand_partition(partition_key: &str) -> Option<&str> {
    single_id(partition_key, BRAND_PREFIX)
}

pub fn parse_campaign_sort_key(sort_key: &str) -> Option<&str> {
    single_id(sort_key, CAMPAIGN_PREFIX)
}

pub fn parse_product_group_sort_key(sort_key: &str) -> Option<&str> {
    single_id(sort_key, PRODUCT_GROUP_PREFIX)
}

pub fn parse_landing_page_sort_key(sort_key: &str) -> Option<&str> {
    single_id(sort_key, LANDING_PAGE_PREFIX)
}

/// `(product_group_id, product_id)`
pub fn parse_membership_sort_key(sort_key: &str) -> Option<(&str, &str)> {
    id_pair(sort_key, PRODUCT_GROUP_PREFIX, PRODUCT_SEGMENT)
}

/// `(product_group_id, campaign_id)`
pub fn parse_product_group_link_sort_key(
    sort_key: &str,
) -> Option<(&str, &str)> {
    id_pair(sort_key, PRODUCT_GROUP_LINK_PREFIX, CAMPAIGN_SEGMENT)
}

/// `(landing_page_id, campaign_id)`
pub fn parse_landing_page_link_sort_key(
    sort_key: &str,
) -> Option<(&str, &str)> {
    id_pair(sort_key, LANDING_PAGE_LINK_PREFIX, CAMPAIGN_SEGMENT)
}

/// `(product_id, window_id)`
pub fn parse_display_page_sort_key(sort_key: &str) -> Option<(&str, &str)> {
    id_pair(sort_key, DISPLAY_PAGE_PREFIX, "#")
}

/// `(campaign_id, event_id)`
pub fn parse_campaign_event_sort_key(sort_key: &str) -> Option<(&str, &str)> {
    id_pair(sort_key, CAMPAIGN_EVENT_PREFIX, "#")
}
