use crate::error::Error;
use crate::tree::{self, TreeRecord};

/// Fetches every tree from `{base_url}/api/trees`.
pub fn fetch_trees(base_url: &str) -> Result<Vec<TreeRecord>, Error> {
    let url = trees_url(base_url);
    log::debug!("fetching {url}");

    let http = |source: reqwest::Error| Error::Http {
        url: url.clone(),
        source: Box::new(source),
    };

    let resp = reqwest::blocking::get(&url).map_err(http)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Status {
            url: url.clone(),
            status: status.as_u16(),
        });
    }
    let body = resp.text().map_err(http)?;
    let trees = tree::parse_tree_list(&body)?;
    log::debug!("{url}: {} trees", trees.len());
    Ok(trees)
}

fn trees_url(base_url: &str) -> String {
    format!("{}/api/trees", base_url.trim_end_matches('/'))
}
