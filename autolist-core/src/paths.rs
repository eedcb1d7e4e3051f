//! On-disk layout under the user's home directory.
//!
//! ```text
//! ~/.autolist/
//!   config.yaml
//!   portfolios/<list>.yaml
//!   items/<list>.yaml
//! ```

use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::types::ListId;

pub const CONFIG_FILE: &str = "config.yaml";

pub fn autolist_root(home: &Path) -> PathBuf {
    home.join(".autolist")
}

pub fn config_path(home: &Path) -> PathBuf {
    autolist_root(home).join(CONFIG_FILE)
}

pub fn portfolios_dir(home: &Path) -> PathBuf {
    autolist_root(home).join("portfolios")
}

pub fn portfolio_path(home: &Path, list: &ListId) -> PathBuf {
    portfolios_dir(home).join(format!("{}.yaml", list.0))
}

pub fn items_dir(home: &Path) -> PathBuf {
    autolist_root(home).join("items")
}

pub fn items_path(home: &Path, list: &ListId) -> PathBuf {
    items_dir(home).join(format!("{}.yaml", list.0))
}

pub fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_in_dot_autolist() {
        let home = Path::new("/home/u");
        let list = ListId::from("favourites");
        assert!(portfolio_path(home, &list).ends_with(".autolist/portfolios/favourites.yaml"));
        assert!(items_path(home, &list).ends_with(".autolist/items/favourites.yaml"));
        assert!(config_path(home).ends_with(".autolist/config.yaml"));
    }
}
