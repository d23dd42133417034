use super::ids::SiteId;

/// A named grouping of sites within a topology, such as one molecule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubTopology {
    pub name: String,
    sites: Vec<SiteId>,
}

impl SubTopology {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sites: Vec::new(),
        }
    }

    /// A subtopology pre-filled with sites. The sites are checked against the
    /// owning topology when the subtopology is added to it.
    pub fn with_sites(name: impl Into<String>, sites: Vec<SiteId>) -> Self {
        let mut subtop = Self::new(name);
        for site in sites {
            subtop.push(site);
        }
        subtop
    }

    pub fn sites(&self) -> &[SiteId] {
        &self.sites
    }

    pub fn n_sites(&self) -> usize {
        self.sites.len()
    }

    pub fn contains(&self, site: SiteId) -> bool {
        self.sites.contains(&site)
    }

    /// Appends a site; adding a site twice is a no-op.
    pub(crate) fn push(&mut self, site: SiteId) -> bool {
        if self.sites.contains(&site) {
            return false;
        }
        self.sites.push(site);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_sites_drops_repeats() {
        let a = SiteId::detached(1);
        let b = SiteId::detached(2);
        let subtop = SubTopology::with_sites("water", vec![a, b, a]);
        assert_eq!(subtop.sites(), &[a, b]);
        assert_eq!(subtop.n_sites(), 2);
        assert!(subtop.contains(b));
    }
}
