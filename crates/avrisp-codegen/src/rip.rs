//! Rendering a target's flash as a paged image source

use avrisp_core::chip::ChipDescriptor;
use avrisp_core::flash::rip_pages;
use avrisp_core::programmer::IspBus;
use avrisp_core::session::IspSession;

use crate::encode::EncodedImage;
use crate::error::Result;
use crate::profile::ChipProfile;
use crate::render::render;

/// Read the target's flash into a paged image based at address 0
///
/// Blank pages are `None`. The page table always covers the whole flash.
pub fn rip_to_image<B: IspBus>(
    session: &mut IspSession<B>,
    chip: &ChipDescriptor,
) -> Result<EncodedImage> {
    let mut pages = Vec::with_capacity(chip.page_count() as usize);
    let used = rip_pages(session, chip, |_, page| pages.push(page.map(<[u8]>::to_vec)))?;
    log::info!("codegen: {} of {} pages in use", used, pages.len());

    Ok(EncodedImage::Paged {
        base_address: 0,
        page_size: chip.page_size,
        pages,
    })
}

/// Read the target's flash and render it as a paged image source file
pub fn rip_to_paged_source<B: IspBus>(
    session: &mut IspSession<B>,
    chip: &ChipDescriptor,
    name: &str,
) -> Result<String> {
    let image = rip_to_image(session, chip)?;
    render(name, &image, &ChipProfile::from_descriptor(chip))
}
