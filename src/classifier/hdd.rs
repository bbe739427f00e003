use super::capacity;
use super::{run_chain, verdict, Context, Hints, Rule, Verdict};
use crate::config::capacity_tolerance::TB_ABS;
use crate::patterns::Patterns;
use crate::types::{Category, Reason, ReasonCode};

const RULES: &[Rule] = &[
    empty_title,
    no_offer,
    accessory,
    nas_device,
    opposite_kind,
    kind_evidence,
    capacity_check,
];

pub fn classify(p: &Patterns, ctx: &Context<'_>) -> Verdict {
    run_chain(RULES, subtype, p, ctx)
}

pub fn hints(p: &Patterns, title: &str) -> Hints {
    let (capacity_tb, _) = capacity::scan(&p.capacity, title).rotating();
    Hints {
        capacity_gb: capacity_tb.map(|tb| (tb * 1024.0).round() as u32),
        capacity_tb,
        interface: p.hdd.interfaces.first(title),
        form_factor: p.hdd.forms.first(title),
        brand: guess_brand(p, title),
    }
}

/// Makers first, then enclosure brands.
pub fn guess_brand(p: &Patterns, title: &str) -> Option<&'static str> {
    p.hdd.makers.guess(title).or_else(|| p.hdd.extra_brands.guess(title))
}

fn has_model_number(p: &Patterns, title: &str) -> bool {
    p.hdd.models.iter().any(|re| re.is_match(title))
}

fn empty_title(_: &Patterns, ctx: &Context<'_>) -> Option<Verdict> {
    if ctx.title.trim().is_empty() {
        return verdict(Category::Other, ReasonCode::EmptyTitle, "empty title");
    }
    None
}

/// Decided before any text is looked at.
fn no_offer(_: &Patterns, ctx: &Context<'_>) -> Option<Verdict> {
    if ctx.no_eligible_offer {
        return verdict(Category::Other, ReasonCode::NoEligibleOffer, "no recommended offer");
    }
    None
}

fn accessory(p: &Patterns, ctx: &Context<'_>) -> Option<Verdict> {
    if p.hdd.accessory.is_match(ctx.title) {
        return verdict(Category::Accessory, ReasonCode::AccessoryKeyword, "accessory keyword");
    }
    None
}

/// NAS appliances, unless the title says the drive is made for one.
fn nas_device(p: &Patterns, ctx: &Context<'_>) -> Option<Verdict> {
    if p.hdd.nas_device.is_match(ctx.title) && !p.hdd.nas_qualifier.is_match(ctx.title) {
        return verdict(Category::NasDevice, ReasonCode::NasDeviceKeyword, "NAS device keyword");
    }
    None
}

fn opposite_kind(p: &Patterns, ctx: &Context<'_>) -> Option<Verdict> {
    if p.hdd.ssd_word.is_match(ctx.title) && !p.hdd.hdd_word.is_match(ctx.title) {
        return verdict(Category::Other, ReasonCode::OppositeKind, "SSD keyword");
    }
    None
}

fn kind_evidence(p: &Patterns, ctx: &Context<'_>) -> Option<Verdict> {
    let t = ctx.title;
    if p.hdd.hint.is_match(t) || has_model_number(p, t) || guess_brand(p, t).is_some() {
        return None;
    }
    verdict(Category::Other, ReasonCode::NoKindEvidence, "not HDD-like")
}

fn capacity_check(p: &Patterns, ctx: &Context<'_>) -> Option<Verdict> {
    if !ctx.checks_capacity() {
        return None;
    }
    let target_tb = match (ctx.target.target_capacity_tb, ctx.target.target_capacity_gb) {
        (Some(tb), _) => tb,
        (None, Some(gb)) => f64::from(gb) / 1024.0,
        (None, None) => return None,
    };

    let (cap, candidates) = capacity::scan(&p.capacity, ctx.title).rotating();
    if candidates.len() > 1 {
        return verdict(Category::Other, ReasonCode::MultiCapacity, "multi-capacity listing");
    }
    let Some(cap) = cap else {
        return verdict(Category::Other, ReasonCode::NoCapacity, "no capacity");
    };
    if (cap - target_tb).abs() > TB_ABS {
        return verdict(Category::Other, ReasonCode::CapacityMismatch, "capacity mismatch");
    }
    None
}

fn subtype(p: &Patterns, ctx: &Context<'_>) -> Verdict {
    let t = ctx.title;
    let internal = p.hdd.internal.is_match(t);
    let external = p.hdd.external.is_match(t);

    if external && !internal {
        return (Category::DriveExternal, Reason::new(ReasonCode::ExternalHints, "external HDD-like"));
    }
    if internal || has_model_number(p, t) || p.hdd.hdd_word.is_match(t) {
        return (Category::DriveInternal, Reason::new(ReasonCode::InternalHints, "internal HDD-like"));
    }
    (Category::DriveInternal, Reason::new(ReasonCode::GenericDrive, "generic HDD"))
}
