use super::capacity::{self, matches_gb, matches_tb};
use super::{run_chain, verdict, Context, Hints, Rule, Verdict};
use crate::patterns::Patterns;
use crate::types::{Category, FormFactor, Interface, Reason, ReasonCode};

const RULES: &[Rule] = &[
    empty_title,
    accessory,
    pc_device,
    other_media,
    kind_evidence,
    capacity_check,
];

pub fn classify(p: &Patterns, ctx: &Context<'_>) -> Verdict {
    run_chain(RULES, subtype, p, ctx)
}

pub fn hints(p: &Patterns, title: &str) -> Hints {
    let (capacity_gb, capacity_tb) = capacity::scan(&p.capacity, title).solid_state();
    Hints {
        capacity_gb,
        capacity_tb,
        interface: p.ssd.interfaces.first(title),
        form_factor: p.ssd.forms.first(title),
        brand: p.ssd.brands.guess(title),
    }
}

fn empty_title(_: &Patterns, ctx: &Context<'_>) -> Option<Verdict> {
    if ctx.title.trim().is_empty() {
        return verdict(Category::Other, ReasonCode::EmptyTitle, "empty title");
    }
    None
}

fn accessory(p: &Patterns, ctx: &Context<'_>) -> Option<Verdict> {
    if p.ssd.accessory.is_match(ctx.title) {
        return verdict(Category::Accessory, ReasonCode::AccessoryKeyword, "accessory keyword");
    }
    None
}

fn pc_device(p: &Patterns, ctx: &Context<'_>) -> Option<Verdict> {
    if p.ssd.pc_device.is_match(ctx.title) {
        return verdict(Category::PcDevice, ReasonCode::PcDeviceKeyword, "pc/device keyword");
    }
    None
}

/// Flash cards, optical media and hard disks. A title that also says SSD is
/// only rejected when it mixes in a memory card or a hard disk.
fn other_media(p: &Patterns, ctx: &Context<'_>) -> Option<Verdict> {
    let t = ctx.title;
    if !p.ssd.other_media.is_match(t) {
        return None;
    }
    if !p.ssd.ssd_word.is_match(t) {
        return verdict(Category::Other, ReasonCode::NonSsdMedia, "non-ssd media");
    }
    if p.ssd.memory_card.is_match(t) {
        return verdict(Category::Other, ReasonCode::MemoryCardMixed, "usb/sd mixed");
    }
    if p.ssd.hdd_word.is_match(t) {
        return verdict(Category::Other, ReasonCode::OppositeKind, "hdd keyword");
    }
    None
}

fn kind_evidence(p: &Patterns, ctx: &Context<'_>) -> Option<Verdict> {
    if p.ssd.ssd_word.is_match(ctx.title) || p.ssd.evidence.is_match(ctx.title) {
        return None;
    }
    verdict(Category::Other, ReasonCode::NoKindEvidence, "no ssd hints")
}

fn capacity_check(p: &Patterns, ctx: &Context<'_>) -> Option<Verdict> {
    if !ctx.checks_capacity() {
        return None;
    }
    let stated = capacity::scan(&p.capacity, ctx.title);
    let target = ctx.target;

    let multi_tb = stated.distinct_tbs().len() > 1;
    let multi_gb = target.target_capacity_tb.is_none() && stated.distinct_gbs().len() > 1;
    if multi_tb || multi_gb {
        return verdict(Category::Other, ReasonCode::MultiCapacity, "multi-capacity listing");
    }
    if stated.is_empty() {
        return verdict(Category::Other, ReasonCode::NoCapacity, "no capacity");
    }

    let (cap_gb, cap_tb) = stated.solid_state();
    let ok = match (target.target_capacity_tb, target.target_capacity_gb) {
        (Some(tb), _) => matches_tb(tb, cap_gb, cap_tb),
        (None, Some(gb)) => matches_gb(gb, cap_gb),
        (None, None) => true,
    };
    if ok {
        None
    } else {
        verdict(Category::Other, ReasonCode::CapacityMismatch, "capacity mismatch")
    }
}

/// External hints win over bus hints; a title with none is a generic SATA drive.
fn subtype(p: &Patterns, ctx: &Context<'_>) -> Verdict {
    let t = ctx.title;
    let iface = p.ssd.interfaces.first(t);
    let form = p.ssd.forms.first(t);

    if p.ssd.external.is_match(t) || matches!(iface, Some(Interface::Usb | Interface::Thunderbolt)) {
        return (Category::DriveExternal, Reason::new(ReasonCode::ExternalHints, "external hints"));
    }
    if p.ssd.nvme.is_match(t) || form == Some(FormFactor::M2) {
        return (Category::DriveInternalNvme, Reason::new(ReasonCode::NvmeHints, "nvme/m.2 hints"));
    }
    if p.ssd.sata.is_match(t) || form == Some(FormFactor::Inch2_5) {
        return (Category::DriveInternalSata, Reason::new(ReasonCode::SataHints, "sata/2.5 hints"));
    }
    (Category::DriveInternalSata, Reason::new(ReasonCode::GenericDrive, "generic ssd"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DriveKind, SearchTarget};

    fn target(gb: Option<u32>, tb: Option<f64>) -> SearchTarget {
        SearchTarget {
            drive_kind: DriveKind::Ssd,
            capacity_token: String::new(),
            target_capacity_gb: gb,
            target_capacity_tb: tb,
        }
    }

    fn run(title: &str, t: &SearchTarget, capacity_match: bool) -> Verdict {
        let p = Patterns::compile().unwrap();
        let ctx = Context { title, target: t, capacity_match, no_eligible_offer: false };
        classify(&p, &ctx)
    }

    fn category(title: &str, t: &SearchTarget) -> Category {
        run(title, t, true).0
    }

    fn code(title: &str, t: &SearchTarget) -> ReasonCode {
        run(title, t, true).1.code
    }

    #[test]
    fn enclosure_is_accessory_regardless_of_target() {
        let title = "SSDケース M.2 NVMe 変換アダプタ USB3.1";
        assert_eq!(category(title, &target(None, Some(1.0))), Category::Accessory);
        assert_eq!(category(title, &target(Some(512), None)), Category::Accessory);
        assert_eq!(category(title, &target(None, None)), Category::Accessory);
    }

    #[test]
    fn pc_listing_is_pc_device() {
        let t = target(None, Some(1.0));
        assert_eq!(category("ゲーミングPC Core i7 SSD 1TB", &t), Category::PcDevice);
    }

    #[test]
    fn other_media_rules() {
        let t = target(Some(128), None);
        assert_eq!(code("SanDisk USBメモリ 128GB", &t), ReasonCode::NonSsdMedia);
        assert_eq!(code("SSD 128GB + microSD カード", &t), ReasonCode::MemoryCardMixed);
        assert_eq!(code("SSD HDD 両対応 128GB", &t), ReasonCode::OppositeKind);
    }

    #[test]
    fn needs_kind_evidence() {
        let t = target(None, Some(1.0));
        assert_eq!(code("Samsung 1TB ストレージ", &t), ReasonCode::NoKindEvidence);
        assert_ne!(code("Samsung 1TB NVMe", &t), ReasonCode::NoKindEvidence);
    }

    #[test]
    fn multi_capacity_listings_rejected() {
        let t = target(None, Some(1.0));
        assert_eq!(code("SSD 1TB 2TB 4TB 選べる", &t), ReasonCode::MultiCapacity);
        // Several GB numbers are fine for a TB target.
        assert_eq!(category("SSD 1TB (1000GB / 1024GB) NVMe", &t), Category::DriveInternalNvme);
        let t = target(Some(512), None);
        assert_eq!(code("SSD 500GB 512GB SATA", &t), ReasonCode::MultiCapacity);
    }

    #[test]
    fn capacity_tolerance() {
        let t = target(None, Some(1.0));
        assert_eq!(code("Samsung SSD NVMe", &t), ReasonCode::NoCapacity);
        assert_eq!(category("SSD 960GB SATA 2.5", &t), Category::DriveInternalSata);
        assert_eq!(code("SSD 900GB SATA", &t), ReasonCode::CapacityMismatch);
        assert_eq!(code("SSD 2TB NVMe", &t), ReasonCode::CapacityMismatch);

        let t = target(Some(512), None);
        assert_eq!(category("Crucial MX500 500GB SATA 2.5", &t), Category::DriveInternalSata);
        assert_eq!(code("Crucial MX500 250GB SATA", &t), ReasonCode::CapacityMismatch);
    }

    #[test]
    fn disabling_capacity_match_skips_only_that_rule() {
        let t = target(None, Some(1.0));
        assert_eq!(run("SSD 2TB NVMe", &t, false).0, Category::DriveInternalNvme);
        assert_eq!(run("SSDケース 2TB", &t, false).0, Category::Accessory);
        let within = "Samsung 970 EVO Plus 1TB NVMe M.2 SSD";
        assert_eq!(run(within, &t, true), run(within, &t, false));
    }

    #[test]
    fn unknown_target_disables_capacity_rule() {
        let t = target(None, None);
        assert_eq!(category("SSD 1TB 2TB NVMe", &t), Category::DriveInternalNvme);
    }

    #[test]
    fn subtypes() {
        let t = target(None, None);
        assert_eq!(code("ポータブルSSD 1TB", &t), ReasonCode::ExternalHints);
        assert_eq!(category("SanDisk Extreme SSD USB 3.2 1TB", &t), Category::DriveExternal);
        assert_eq!(category("WD Black SN850X 2TB PCIe Gen4", &t), Category::DriveInternalNvme);
        assert_eq!(category("Crucial MX500 SATA 1TB", &t), Category::DriveInternalSata);
        assert_eq!(code("Samsung SSD 1TB", &t), ReasonCode::GenericDrive);
        assert_eq!(category("Samsung SSD 1TB", &t), Category::DriveInternalSata);
    }

    #[test]
    fn hints_read_title_attributes() {
        let p = Patterns::compile().unwrap();
        let h = hints(&p, "Crucial P3 Plus 500GB M.2 2280 NVMe");
        assert_eq!(h.capacity_gb, Some(500));
        assert_eq!(h.capacity_tb, None);
        assert_eq!(h.form_factor, Some(FormFactor::M2));
        assert_eq!(h.interface, Some(Interface::Nvme));
        assert_eq!(h.brand, Some("Crucial"));
    }
}
