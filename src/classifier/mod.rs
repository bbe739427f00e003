//! Listing classification.
//!
//! Each drive kind has an ordered rule chain. A rule either returns a verdict or
//! passes; the first verdict wins and the chain's terminal step assigns the
//! drive subtype. Classification never fails: every branch ends in a category.

pub mod capacity;
pub mod hdd;
pub mod ssd;

use crate::patterns::Patterns;
use crate::types::{
    Category, ClassifiedItem, DriveKind, FormFactor, Interface, RawListing, Reason, ReasonCode,
    SearchTarget,
};

pub type Verdict = (Category, Reason);

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub title: &'a str,
    pub target: &'a SearchTarget,
    pub capacity_match: bool,
    /// Upstream saw a "no featured offer" notice in the listing's fragment.
    pub no_eligible_offer: bool,
}

impl Context<'_> {
    /// Capacity rules only run when enabled and the query resolved a target.
    pub fn checks_capacity(&self) -> bool {
        self.capacity_match && self.target.has_capacity()
    }
}

pub type Rule = fn(&Patterns, &Context<'_>) -> Option<Verdict>;

/// Evaluate `rules` in order; `terminal` decides when none fires.
pub fn run_chain(
    rules: &[Rule],
    terminal: fn(&Patterns, &Context<'_>) -> Verdict,
    patterns: &Patterns,
    ctx: &Context<'_>,
) -> Verdict {
    rules
        .iter()
        .find_map(|rule| rule(patterns, ctx))
        .unwrap_or_else(|| terminal(patterns, ctx))
}

pub(crate) fn verdict(category: Category, code: ReasonCode, detail: &str) -> Option<Verdict> {
    Some((category, Reason::new(code, detail)))
}

/// Attributes read off a title independently of its category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hints {
    pub capacity_gb: Option<u32>,
    pub capacity_tb: Option<f64>,
    pub interface: Option<Interface>,
    pub form_factor: Option<FormFactor>,
    pub brand: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifyOptions {
    pub raw: bool,
    pub brand_only: bool,
    pub capacity_match: bool,
}

/// Kind-specific front end over the shared pattern tables.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    patterns: &'a Patterns,
    kind: DriveKind,
}

impl<'a> Classifier<'a> {
    pub fn new(patterns: &'a Patterns, kind: DriveKind) -> Self {
        Self { patterns, kind }
    }

    /// Category and reason for one title.
    pub fn classify(
        &self,
        title: &str,
        target: &SearchTarget,
        capacity_match: bool,
        no_eligible_offer: bool,
    ) -> Verdict {
        let ctx = Context { title, target, capacity_match, no_eligible_offer };
        match self.kind {
            DriveKind::Ssd => ssd::classify(self.patterns, &ctx),
            DriveKind::Hdd => hdd::classify(self.patterns, &ctx),
        }
    }

    pub fn hints(&self, title: &str) -> Hints {
        match self.kind {
            DriveKind::Ssd => ssd::hints(self.patterns, title),
            DriveKind::Hdd => hdd::hints(self.patterns, title),
        }
    }

    /// Brand gate used by brand-only mode. Rotating drives only accept makers.
    pub fn has_known_brand(&self, title: &str) -> bool {
        match self.kind {
            DriveKind::Ssd => self.patterns.ssd.brands.guess(title).is_some(),
            DriveKind::Hdd => self.patterns.hdd.makers.guess(title).is_some(),
        }
    }

    /// Wrap a listing with its category and hints.
    ///
    /// Raw mode skips classification. A solid-state listing without an eligible
    /// offer is `bad_offer` before any rule runs. Brand-only mode downgrades an
    /// unknown brand to `other` whatever the rules decided.
    pub fn classify_listing(
        &self,
        listing: RawListing,
        target: &SearchTarget,
        opts: ClassifyOptions,
    ) -> ClassifiedItem {
        let hints = self.hints(&listing.title);

        let (category, reason) = if opts.raw {
            (Category::Raw, Reason::new(ReasonCode::RawMode, "raw mode"))
        } else if self.kind == DriveKind::Ssd && listing.no_eligible_offer {
            (Category::BadOffer, Reason::new(ReasonCode::NoEligibleOffer, "featured offer missing"))
        } else {
            let v = self.classify(&listing.title, target, opts.capacity_match, listing.no_eligible_offer);
            if opts.brand_only && !self.has_known_brand(&listing.title) {
                (Category::Other, Reason::new(ReasonCode::BrandOnly, "brand-only: unknown brand"))
            } else {
                v
            }
        };

        ClassifiedItem {
            listing,
            category,
            reason,
            capacity_gb: hints.capacity_gb,
            capacity_tb: hints.capacity_tb,
            interface: hints.interface,
            form_factor: hints.form_factor,
            brand: hints.brand,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(kind: DriveKind, tb: Option<f64>) -> SearchTarget {
        SearchTarget {
            drive_kind: kind,
            capacity_token: String::new(),
            target_capacity_gb: None,
            target_capacity_tb: tb,
        }
    }

    fn listing(title: &str, no_offer: bool) -> RawListing {
        RawListing {
            id: "B0TEST0001".into(),
            title: title.into(),
            price_yen: Some(1000),
            is_sponsored: false,
            no_eligible_offer: no_offer,
            source_url: "https://example.test/dp/B0TEST0001".into(),
        }
    }

    const OPTS: ClassifyOptions = ClassifyOptions { raw: false, brand_only: false, capacity_match: true };

    #[test]
    fn chain_is_first_match_wins() {
        fn never(_: &Patterns, _: &Context<'_>) -> Option<Verdict> {
            None
        }
        fn first(_: &Patterns, _: &Context<'_>) -> Option<Verdict> {
            verdict(Category::Accessory, ReasonCode::AccessoryKeyword, "first")
        }
        fn second(_: &Patterns, _: &Context<'_>) -> Option<Verdict> {
            verdict(Category::PcDevice, ReasonCode::PcDeviceKeyword, "second")
        }
        fn terminal(_: &Patterns, _: &Context<'_>) -> Verdict {
            (Category::Other, Reason::new(ReasonCode::GenericDrive, "terminal"))
        }

        let p = Patterns::compile().unwrap();
        let t = target(DriveKind::Ssd, None);
        let ctx = Context { title: "x", target: &t, capacity_match: true, no_eligible_offer: false };
        assert_eq!(run_chain(&[never, first, second], terminal, &p, &ctx).0, Category::Accessory);
        assert_eq!(run_chain(&[never], terminal, &p, &ctx).0, Category::Other);
    }

    #[test]
    fn samsung_nvme_listing_is_internal_drive() {
        let p = Patterns::compile().unwrap();
        let c = Classifier::new(&p, DriveKind::Ssd);
        let item = c.classify_listing(
            listing("Samsung 970 EVO Plus 1TB NVMe M.2 SSD", false),
            &target(DriveKind::Ssd, Some(1.0)),
            OPTS,
        );
        assert!(item.category.as_str().starts_with("drive_internal"));
        assert_eq!(item.brand, Some("Samsung"));
        assert_eq!(item.capacity_tb, Some(1.0));
        assert_eq!(item.capacity_gb, Some(1024));
        assert!(!item.reason.detail.is_empty());
    }

    #[test]
    fn raw_mode_skips_rules() {
        let p = Patterns::compile().unwrap();
        let c = Classifier::new(&p, DriveKind::Ssd);
        let opts = ClassifyOptions { raw: true, ..OPTS };
        let item = c.classify_listing(listing("SSDケース USB", true), &target(DriveKind::Ssd, None), opts);
        assert_eq!(item.category, Category::Raw);
        assert_eq!(item.reason.code, ReasonCode::RawMode);
    }

    #[test]
    fn solid_state_without_offer_is_bad_offer() {
        let p = Patterns::compile().unwrap();
        let c = Classifier::new(&p, DriveKind::Ssd);
        let item = c.classify_listing(
            listing("Samsung 870 EVO 1TB SATA SSD", true),
            &target(DriveKind::Ssd, Some(1.0)),
            OPTS,
        );
        assert_eq!(item.category, Category::BadOffer);
    }

    #[test]
    fn rotating_without_offer_is_other() {
        let p = Patterns::compile().unwrap();
        let c = Classifier::new(&p, DriveKind::Hdd);
        let item = c.classify_listing(
            listing("Seagate BarraCuda 4TB 3.5インチ 内蔵HDD", true),
            &target(DriveKind::Hdd, Some(4.0)),
            OPTS,
        );
        assert_eq!(item.category, Category::Other);
        assert_eq!(item.reason.code, ReasonCode::NoEligibleOffer);
    }

    #[test]
    fn brand_only_downgrades_unknown_brands() {
        let p = Patterns::compile().unwrap();
        let opts = ClassifyOptions { brand_only: true, ..OPTS };

        let ssd = Classifier::new(&p, DriveKind::Ssd);
        let item = ssd.classify_listing(
            listing("NoName SSD 1TB NVMe M.2", false),
            &target(DriveKind::Ssd, Some(1.0)),
            opts,
        );
        assert_eq!(item.category, Category::Other);
        assert_eq!(item.reason.code, ReasonCode::BrandOnly);

        // Enclosure brands are not drive makers.
        let hdd = Classifier::new(&p, DriveKind::Hdd);
        let item = hdd.classify_listing(
            listing("BUFFALO 外付けHDD 4TB USB3.2", false),
            &target(DriveKind::Hdd, Some(4.0)),
            opts,
        );
        assert_eq!(item.category, Category::Other);
        assert_eq!(item.brand, Some("BUFFALO"));

        let item = hdd.classify_listing(
            listing("BUFFALO 外付けHDD 4TB USB3.2", false),
            &target(DriveKind::Hdd, Some(4.0)),
            OPTS,
        );
        assert_eq!(item.category, Category::DriveExternal);
    }
}
