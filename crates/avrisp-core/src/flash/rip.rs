//! Flash read-back

use super::buffer::PageBuffer;
use super::operations::read_page;
use crate::chip::ChipDescriptor;
use crate::error::{Error, Result};
use crate::programmer::IspBus;
use crate::session::IspSession;

/// Read every flash page and hand it to `visit`
///
/// `visit` receives the page's byte address and `Some(bytes)`, or `None`
/// for a page that reads as all 0xFF. Returns the number of non-blank
/// pages. Nothing is written to the target.
pub fn rip_pages<B, F>(
    session: &mut IspSession<B>,
    chip: &ChipDescriptor,
    mut visit: F,
) -> Result<u32>
where
    B: IspBus,
    F: FnMut(u32, Option<&[u8]>),
{
    if !chip.is_well_formed() {
        return Err(Error::InvalidDescriptor);
    }
    let mut page = PageBuffer::acquire(chip.page_size)?;

    log::info!("avrisp: reading {} pages from {}", chip.page_count(), chip.name);
    let mut used = 0;
    for address in (0..chip.flash_size).step_by(chip.page_size as usize) {
        read_page(session, address, &mut page)?;
        if page.is_blank() {
            visit(address, None);
        } else {
            used += 1;
            visit(address, Some(&page));
        }
    }
    Ok(used)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBus;

    #[test]
    fn test_rip_marks_blank_pages() {
        let chip = ChipDescriptor::new(1, "tiny", [0xFF; 4], [0xFF; 4], 8, 4);
        let mut bus = ScriptedBus {
            idle_response: [0, 0, 0, 0xFF],
            ..Default::default()
        };
        for value in [0x0C, 0x94, 0xFF, 0xFF] {
            bus.responses.push_back([0, 0, 0, value]);
        }
        let mut session = IspSession::new(bus);
        session.begin(false).unwrap();

        let mut seen = Vec::new();
        let used = rip_pages(&mut session, &chip, |address, page| {
            seen.push((address, page.map(|p| p.to_vec())));
        })
        .unwrap();

        assert_eq!(used, 1);
        assert_eq!(
            seen,
            vec![(0, Some(vec![0x0C, 0x94, 0xFF, 0xFF])), (4, None)]
        );
        // Only reads were issued
        assert!(session.bus_ref().sent()[1..]
            .iter()
            .all(|c| c[0] == 0x20 || c[0] == 0x28));
    }
}
