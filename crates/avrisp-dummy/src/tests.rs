use super::*;

use avrisp_core::chip::{self, ChipRegistry};
use avrisp_core::error::Error;
use avrisp_core::flash::{self, UploadProgress, UploadStats};
use avrisp_core::fuse;
use avrisp_core::image::{ContiguousImage, FirmwareImage, HexLineImage, PagedImage};
use avrisp_core::hex::{HexRecord, RecordType};
use avrisp_core::protocol;
use avrisp_core::session::IspSession;

fn m328p() -> ChipDescriptor {
    ChipRegistry::builtin().resolve(0x950F)
}

fn session_for(chip: &ChipDescriptor) -> IspSession<DummyTarget> {
    let mut session = IspSession::new(DummyTarget::for_chip(chip));
    session.begin(false).unwrap();
    session
}

fn target(session: &IspSession<DummyTarget>) -> &DummyTarget {
    session.bus_ref()
}

static ZERO_PAGE: [u8; 128] = [0x00; 128];

#[test]
fn test_signature() {
    let mut session = session_for(&m328p());
    assert_eq!(chip::read_signature(&mut session).unwrap(), 0x950F);
    let bus = session.bus().unwrap();
    assert_eq!(protocol::read_signature_byte(bus, 0).unwrap(), ATMEL_ID);
}

#[test]
fn test_ignores_commands_outside_programming_mode() {
    let mut target = DummyTarget::new(DummyConfig::default());
    assert_eq!(target.transfer([0xAC, 0x80, 0, 0]).unwrap(), [0xFF; 4]);
    assert!(target.trace().is_empty());
}

#[test]
fn test_write_requires_erase() {
    let mut session = session_for(&m328p());
    let page = [0x0F; 128];
    flash::write_page(&mut session, 0, &page).unwrap();
    let other = [0xF0; 128];
    flash::write_page(&mut session, 0, &other).unwrap();
    // Commits only clear bits
    assert!(target(&session).flash()[..128].iter().all(|&b| b == 0x00));

    flash::erase_chip(&mut session).unwrap();
    flash::write_page(&mut session, 0, &other).unwrap();
    flash::verify_page(&mut session, 0, &other).unwrap();
}

/// Image with page 0 all zeros and page 1 all 0xFF
#[test]
fn test_upload_one_page() {
    let chip = m328p();
    assert_eq!(chip.flash_size, 32768);
    assert_eq!(chip.page_size, 128);

    let mut data = [0xFFu8; 256];
    data[..128].fill(0x00);
    let image = FirmwareImage::Contiguous(ContiguousImage::new("zeros", 0, &data));

    let mut session = session_for(&chip);
    let stats = flash::upload_image(&mut session, &chip, &image).unwrap();
    assert_eq!(
        stats,
        UploadStats {
            pages_written: 1,
            pages_skipped: 255
        }
    );

    let target = target(&session);
    assert_eq!(target.count(|op| *op == TargetOp::ChipErase), 1);
    assert_eq!(
        target.count(|op| matches!(op, TargetOp::WriteFuse { fuse, .. } if *fuse != Fuse::Lock)),
        3
    );
    assert_eq!(
        target.count(|op| matches!(op, TargetOp::WriteFuse { fuse: Fuse::Lock, .. })),
        1
    );
    assert_eq!(
        target.count(|op| matches!(op, TargetOp::WritePage { .. })),
        1
    );
    assert_eq!(
        target.count(|op| matches!(op, TargetOp::LoadPage { .. })),
        128
    );
    // Per-page verify reads back exactly page 0
    assert_eq!(
        target.count(|op| matches!(op, TargetOp::ReadFlash { address } if *address < 128)),
        128
    );
    assert_eq!(
        target.count(|op| matches!(op, TargetOp::ReadFlash { .. })),
        128
    );

    assert!(target.flash()[..128].iter().all(|&b| b == 0x00));
    assert!(target.flash()[128..].iter().all(|&b| b == 0xFF));
    assert_eq!(target.fuses(), [0xFF, 0xDA, 0xFD, 0xCF]);
}

#[test]
fn test_operation_order() {
    let chip = m328p();
    let image = FirmwareImage::Contiguous(ContiguousImage::new("zeros", 0, &ZERO_PAGE));
    let mut session = session_for(&chip);
    flash::upload_image(&mut session, &chip, &image).unwrap();

    let trace = target(&session).trace();
    let first = |pred: fn(&TargetOp) -> bool| trace.iter().position(|op| pred(op)).unwrap();
    let last = |pred: fn(&TargetOp) -> bool| trace.iter().rposition(|op| pred(op)).unwrap();

    let signature = first(|op| matches!(op, TargetOp::ReadSignature(_)));
    let erase = first(|op| *op == TargetOp::ChipErase);
    let first_fuse = first(|op| matches!(op, TargetOp::WriteFuse { .. }));
    let first_load = first(|op| matches!(op, TargetOp::LoadPage { .. }));
    let last_read = last(|op| matches!(op, TargetOp::ReadFlash { .. }));
    let lock = first(|op| matches!(op, TargetOp::WriteFuse { fuse: Fuse::Lock, .. }));

    assert!(signature < erase);
    assert!(erase < first_fuse);
    assert!(first_fuse < first_load);
    assert!(last_read < lock);
    assert_eq!(lock, last(|op| matches!(op, TargetOp::WriteFuse { .. })));
}

/// Blank pages are only safe to skip because the erase already cleared them
#[test]
fn test_erase_precedes_blank_skip() {
    let chip = m328p();
    let mut dirty = vec![0xFF; chip.flash_size as usize];
    dirty[128..256].fill(0x55);
    let mut session = IspSession::new(DummyTarget::with_flash(
        DummyConfig::for_chip(&chip),
        &dirty,
    ));
    session.begin(false).unwrap();

    let image = FirmwareImage::Contiguous(ContiguousImage::new("zeros", 0, &ZERO_PAGE));
    flash::upload_image(&mut session, &chip, &image).unwrap();

    let target = target(&session);
    let erase = target
        .trace()
        .iter()
        .position(|op| *op == TargetOp::ChipErase)
        .unwrap();
    let first_page_op = target
        .trace()
        .iter()
        .position(|op| matches!(op, TargetOp::LoadPage { .. } | TargetOp::WritePage { .. }))
        .unwrap();
    assert!(erase < first_page_op);
    // The skipped page holds erased content, not the old data
    assert!(target.flash()[128..256].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_signature_mismatch_has_no_side_effects() {
    let chip = m328p();
    let m168 = ChipRegistry::builtin().resolve(0x9406);
    let mut session = session_for(&m168);
    session.bus().unwrap().set_fuse(Fuse::High, 0xDF);
    let before_flash = target(&session).flash().to_vec();
    let before_fuses = target(&session).fuses();

    let image = FirmwareImage::Contiguous(ContiguousImage::new("zeros", 0, &ZERO_PAGE));
    assert_eq!(
        flash::upload_image(&mut session, &chip, &image),
        Err(Error::SignatureMismatch {
            expected: 0x950F,
            found: 0x9406
        })
    );

    let target = target(&session);
    assert!(target
        .trace()
        .iter()
        .all(|op| matches!(op, TargetOp::ProgrammingEnable { .. } | TargetOp::ReadSignature(_))));
    assert_eq!(target.flash(), &before_flash[..]);
    assert_eq!(target.fuses(), before_fuses);
}

#[test]
fn test_no_sync() {
    let config = DummyConfig {
        sync_after: None,
        ..DummyConfig::default()
    };
    let mut session = IspSession::new(DummyTarget::new(config));
    assert_eq!(session.begin(false), Err(Error::SyncError));
    assert_eq!(target(&session).enable_attempts(), 255);
    assert!(!target(&session).is_programming());
    assert!(!session.is_active());
}

#[test]
fn test_late_sync() {
    let config = DummyConfig {
        sync_after: Some(3),
        ..DummyConfig::default()
    };
    let mut session = IspSession::new(DummyTarget::new(config));
    session.begin(false).unwrap();
    assert_eq!(target(&session).enable_attempts(), 4);
    // 50 + 50 for the first pulse, 5 + 50 for each retry
    assert_eq!(target(&session).elapsed_ms(), 100 + 3 * 55);
}

#[test]
fn test_end_releases_target() {
    let mut session = session_for(&m328p());
    assert!(target(&session).is_programming());
    session.end();
    assert!(!target(&session).is_programming());

    let mut target = DummyTarget::new(DummyConfig::default());
    {
        let mut session = IspSession::new(&mut target);
        session.begin(true).unwrap();
        assert!(session.bus_ref().clock_output());
    }
    assert!(!target.is_programming());
    assert!(!target.clock_output());
}

#[test]
fn test_fuse_verify_failure_stops_upload() {
    let chip = m328p();
    let mut session = session_for(&chip);
    session.bus().unwrap().faults_mut().stuck_fuse = Some(Fuse::High);

    let image = FirmwareImage::Contiguous(ContiguousImage::new("zeros", 0, &ZERO_PAGE));
    assert_eq!(
        flash::upload_image(&mut session, &chip, &image),
        Err(Error::FuseVerifyError {
            fuse: Fuse::High,
            expected: 0xDA,
            read: 0xD9
        })
    );
    let target = target(&session);
    assert_eq!(target.count(|op| matches!(op, TargetOp::LoadPage { .. })), 0);
    assert_eq!(
        target.count(|op| matches!(op, TargetOp::WriteFuse { fuse: Fuse::Ext, .. })),
        0
    );
}

#[test]
fn test_flash_verify_failure() {
    let chip = m328p();
    let mut session = session_for(&chip);
    session.bus().unwrap().faults_mut().flipped_bits = Some((0x42, 0x10));

    let image = FirmwareImage::Contiguous(ContiguousImage::new("zeros", 0, &ZERO_PAGE));
    assert_eq!(
        flash::upload_image(&mut session, &chip, &image),
        Err(Error::FlashVerifyError {
            address: 0x42,
            written: 0x00,
            read: 0x10
        })
    );
    assert_eq!(
        target(&session).count(|op| matches!(op, TargetOp::WriteFuse { fuse: Fuse::Lock, .. })),
        0
    );
}

#[test]
fn test_commit_error() {
    let chip = m328p();
    let mut session = session_for(&chip);
    session.bus().unwrap().faults_mut().corrupt_commit_echo = true;

    let image = FirmwareImage::Contiguous(ContiguousImage::new("zeros", 0x80, &ZERO_PAGE));
    assert_eq!(
        flash::upload_image(&mut session, &chip, &image),
        Err(Error::CommitError { address: 0x80 })
    );
}

#[test]
fn test_busy_timeout() {
    let chip = m328p();
    let mut session = session_for(&chip);
    session.bus().unwrap().faults_mut().stuck_busy = true;
    assert_eq!(flash::erase_chip(&mut session), Err(Error::BusyTimeout));
}

#[test]
fn test_upload_relocks_locked_chip() {
    let chip = m328p();
    let mut session = session_for(&chip);
    // Lock mode 3: no further programming or verification
    session.bus().unwrap().set_fuse(Fuse::Lock, 0x0C);
    assert!(target(&session).flash_locked());

    let image = FirmwareImage::Contiguous(ContiguousImage::new("zeros", 0, &ZERO_PAGE));
    flash::upload_image(&mut session, &chip, &image).unwrap();
    assert!(!target(&session).flash_locked());
    assert!(target(&session).flash()[..128].iter().all(|&b| b == 0));
}

#[test]
fn test_paged_image_page_size_mismatch() {
    static PAGES: [Option<&[u8]>; 1] = [Some(ZERO_PAGE.as_slice())];
    let m88 = ChipRegistry::builtin().resolve(0x930A);
    let mut session = session_for(&m88);

    let image = FirmwareImage::Paged(PagedImage::new("boot", 0, 128, &PAGES));
    assert_eq!(
        flash::upload_image(&mut session, &m88, &image),
        Err(Error::PageSizeMismatch {
            image: 128,
            chip: 64
        })
    );
    // Rejected before touching the target
    assert!(target(&session)
        .trace()
        .iter()
        .all(|op| matches!(op, TargetOp::ProgrammingEnable { .. })));
}

#[test]
fn test_upload_hex_lines_and_verify() {
    static CODE: [u8; 16] = [
        0x0C, 0x94, 0x34, 0x00, 0x0C, 0x94, 0x3E, 0x00, 0x0C, 0x94, 0x3E, 0x00, 0x0C, 0x94, 0x3E,
        0x00,
    ];
    static RECORDS: [HexRecord<'static>; 3] = [
        HexRecord::with_checksum(0x0000, RecordType::Data, &CODE),
        HexRecord::with_checksum(0x0100, RecordType::Data, &CODE),
        HexRecord::with_checksum(0x0000, RecordType::EndOfFile, &[]),
    ];
    let chip = ChipRegistry::builtin().resolve(0x940B);
    let image = FirmwareImage::HexLines(HexLineImage::new("blink", &RECORDS));

    let mut session = session_for(&chip);
    let stats = flash::upload_image(&mut session, &chip, &image).unwrap();
    assert_eq!(stats.pages_written, 2);
    assert_eq!(&target(&session).flash()[0x100..0x110], &CODE);

    assert_eq!(flash::verify_image(&mut session, &chip, &image).unwrap(), 2);

    session.bus().unwrap().flash_mut()[0x105] = 0x00;
    assert_eq!(
        flash::verify_image(&mut session, &chip, &image),
        Err(Error::FlashVerifyError {
            address: 0x105,
            written: 0x94,
            read: 0x00
        })
    );
}

#[test]
fn test_rip_roundtrip() {
    let chip = ChipRegistry::builtin().resolve(0x930F);
    let mut session = session_for(&chip);
    {
        let flash = session.bus().unwrap().flash_mut();
        flash[0..4].copy_from_slice(&[1, 2, 3, 4]);
        flash[0x1FC0] = 0x99;
    }

    let mut pages = Vec::new();
    let used = flash::rip_pages(&mut session, &chip, |address, page| {
        pages.push((address, page.map(<[u8]>::to_vec)));
    })
    .unwrap();
    assert_eq!(used, 2);
    assert_eq!(pages.len(), 128);
    assert!(pages[0].1.is_some());
    assert_eq!(pages[127].0, 0x1FC0);
    assert_eq!(pages[127].1.as_ref().unwrap()[0], 0x99);
    assert!(pages[1..127].iter().all(|(_, page)| page.is_none()));
    assert_eq!(
        target(&session).count(|op| !matches!(
            op,
            TargetOp::ProgrammingEnable { .. } | TargetOp::ReadFlash { .. }
        )),
        0
    );
}

#[test]
fn test_read_fuses() {
    let mut session = session_for(&m328p());
    assert_eq!(fuse::read_fuses(&mut session).unwrap(), [0x62, 0xD9, 0xFF, 0xFF]);
}

#[derive(Default)]
struct Recorder {
    events: Vec<&'static str>,
    pages: u32,
    total: u32,
}

impl UploadProgress for Recorder {
    fn erasing(&mut self) {
        self.events.push("erase");
    }

    fn programming_fuses(&mut self) {
        self.events.push("fuses");
    }

    fn writing(&mut self, total_pages: u32) {
        self.total = total_pages;
        self.events.push("write");
    }

    fn page_done(&mut self, _address: u32, _written: bool) {
        self.pages += 1;
    }

    fn locking(&mut self) {
        self.events.push("lock");
    }

    fn complete(&mut self, _stats: &UploadStats) {
        self.events.push("done");
    }
}

#[test]
fn test_progress_from_offset_base() {
    let chip = m328p();
    let image = FirmwareImage::Contiguous(ContiguousImage::new("boot", 0x7E10, &ZERO_PAGE[..64]));
    let mut session = session_for(&chip);
    let mut progress = Recorder::default();
    flash::upload_image_with_progress(&mut session, &chip, &image, &mut progress).unwrap();

    assert_eq!(progress.events, vec!["erase", "fuses", "write", "lock", "done"]);
    // Base aligned down to 0x7E00: four pages remain
    assert_eq!(progress.total, 4);
    assert_eq!(progress.pages, 4);
    assert!(target(&session).flash()[0x7E00..0x7E10].iter().all(|&b| b == 0xFF));
    assert!(target(&session).flash()[0x7E10..0x7E50].iter().all(|&b| b == 0x00));
}
