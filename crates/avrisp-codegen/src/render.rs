//! Rust source emission for encoded images
//!
//! The generated file holds only `static` data and one `const` descriptor,
//! so it can be `include!`d into a `no_std` programmer build:
//!
//! ```text
//! static BLINK_PAGE_0000: [u8; 128] = [0x0C, 0x94, ...];
//! static BLINK_PAGES: [Option<&[u8]>; 2] = [Some(BLINK_PAGE_0000.as_slice()), None];
//! pub static BLINK_IMAGE: FirmwareImage<'static> =
//!     FirmwareImage::Paged(PagedImage::new("blink", 0x0000, 128, &BLINK_PAGES));
//! pub const BLINK_CHIP: ChipDescriptor = ChipDescriptor::new(0x950F, "m328p", ...);
//! ```

use proc_macro2::{Ident, Literal, Span, TokenStream};
use quote::{format_ident, quote};

use avrisp_core::hex::RecordType;

use crate::encode::EncodedImage;
use crate::error::Result;
use crate::profile::ChipProfile;

fn hex_u8(value: u8) -> syn::LitInt {
    syn::LitInt::new(&format!("0x{:02X}", value), Span::call_site())
}

fn hex_u16(value: u16) -> syn::LitInt {
    syn::LitInt::new(&format!("0x{:04X}", value), Span::call_site())
}

fn hex_u32(value: u32) -> syn::LitInt {
    syn::LitInt::new(&format!("0x{:04X}", value), Span::call_site())
}

fn byte_array(bytes: &[u8]) -> TokenStream {
    let bytes = bytes.iter().copied().map(hex_u8);
    quote!([#(#bytes),*])
}

fn record_type(kind: RecordType) -> TokenStream {
    match kind {
        RecordType::Data => quote!(RecordType::Data),
        RecordType::EndOfFile => quote!(RecordType::EndOfFile),
        RecordType::ExtendedSegmentAddress => quote!(RecordType::ExtendedSegmentAddress),
        RecordType::StartSegmentAddress => quote!(RecordType::StartSegmentAddress),
        RecordType::ExtendedLinearAddress => quote!(RecordType::ExtendedLinearAddress),
        RecordType::StartLinearAddress => quote!(RecordType::StartLinearAddress),
    }
}

/// Identifier prefix derived from the image name
///
/// Non-alphanumeric characters become `_`; a leading digit gets an `_`
/// prefix.
pub fn identifier_prefix(name: &str) -> String {
    let mut prefix: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    if prefix.is_empty() || prefix.starts_with(|c: char| c.is_ascii_digit()) {
        prefix.insert(0, '_');
    }
    prefix
}

fn descriptor_tokens(ident: &Ident, profile: &ChipProfile) -> TokenStream {
    let signature = hex_u16(profile.signature);
    let name = &profile.name;
    let mask = byte_array(&profile.fuse_mask.to_array());
    let bits = byte_array(&profile.fuses.to_array());
    let flash_size = Literal::u32_unsuffixed(profile.flash_bytes());
    let page_size = Literal::u16_unsuffixed(profile.page_size);

    quote! {
        pub const #ident: ChipDescriptor = ChipDescriptor::new(
            #signature,
            #name,
            #mask,
            #bits,
            #flash_size,
            #page_size,
        );
    }
}

fn image_tokens(prefix: &str, name: &str, image: &EncodedImage) -> TokenStream {
    let image_ident = format_ident!("{}_IMAGE", prefix);

    match image {
        EncodedImage::Contiguous { base_address, data } => {
            let data_ident = format_ident!("{}_DATA", prefix);
            let len = Literal::usize_unsuffixed(data.len());
            let bytes = byte_array(data);
            let base = hex_u32(*base_address);
            quote! {
                use avrisp_core::image::{ContiguousImage, FirmwareImage};

                static #data_ident: [u8; #len] = #bytes;

                pub static #image_ident: FirmwareImage<'static> =
                    FirmwareImage::Contiguous(ContiguousImage::new(#name, #base, &#data_ident));
            }
        }
        EncodedImage::Paged {
            base_address,
            page_size,
            pages,
        } => {
            let table_ident = format_ident!("{}_PAGES", prefix);
            let mut statics = Vec::new();
            let mut entries = Vec::new();
            for (index, page) in pages.iter().enumerate() {
                match page {
                    Some(bytes) => {
                        let address = index * *page_size as usize;
                        let ident = Ident::new(
                            &format!("{}_PAGE_{:04X}", prefix, address),
                            Span::call_site(),
                        );
                        let len = Literal::usize_unsuffixed(bytes.len());
                        let bytes = byte_array(bytes);
                        statics.push(quote!(static #ident: [u8; #len] = #bytes;));
                        entries.push(quote!(Some(#ident.as_slice())));
                    }
                    None => entries.push(quote!(None)),
                }
            }
            let count = Literal::usize_unsuffixed(pages.len());
            let base = hex_u32(*base_address);
            let page_size = Literal::u16_unsuffixed(*page_size);
            quote! {
                use avrisp_core::image::{FirmwareImage, PagedImage};

                #(#statics)*

                static #table_ident: [Option<&[u8]>; #count] = [#(#entries),*];

                pub static #image_ident: FirmwareImage<'static> =
                    FirmwareImage::Paged(PagedImage::new(#name, #base, #page_size, &#table_ident));
            }
        }
        EncodedImage::HexLines { records } => {
            let records_ident = format_ident!("{}_RECORDS", prefix);
            let mut statics = Vec::new();
            let mut entries = Vec::new();
            for (index, record) in records.iter().enumerate() {
                let ident = format_ident!("{}_LINE_{}", prefix, index);
                let len = Literal::usize_unsuffixed(record.data.len());
                let bytes = byte_array(&record.data);
                statics.push(quote!(static #ident: [u8; #len] = #bytes;));

                let length = hex_u8(record.data.len() as u8);
                let address = hex_u16(record.address);
                let kind = record_type(record.kind);
                let checksum = hex_u8(record.checksum);
                entries.push(quote!(
                    HexRecord::new(#length, #address, #kind, &#ident, #checksum)
                ));
            }
            let count = Literal::usize_unsuffixed(records.len());
            quote! {
                use avrisp_core::hex::{HexRecord, RecordType};
                use avrisp_core::image::{FirmwareImage, HexLineImage};

                #(#statics)*

                static #records_ident: [HexRecord<'static>; #count] = [#(#entries),*];

                pub static #image_ident: FirmwareImage<'static> =
                    FirmwareImage::HexLines(HexLineImage::new(#name, &#records_ident));
            }
        }
    }
}

/// Render an encoded image and its chip profile as a Rust source file
pub fn render(name: &str, image: &EncodedImage, profile: &ChipProfile) -> Result<String> {
    let prefix = identifier_prefix(name);
    let chip_ident = format_ident!("{}_CHIP", prefix);
    let image = image_tokens(&prefix, name, image);
    let chip = descriptor_tokens(&chip_ident, profile);

    let tokens = quote! {
        use avrisp_core::chip::ChipDescriptor;

        #image

        #chip
    };

    let syntax_tree: syn::File = syn::parse2(tokens)?;
    let body = prettyplease::unparse(&syntax_tree);
    log::debug!("codegen: rendered '{}' ({} bytes)", name, body.len());

    Ok(format!(
        "// Generated by avrisp-codegen from '{}'\n// Do not edit manually!\n\n{}",
        name, body
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{decode_hex, encode, ImageFormat};

    const BLINK: &str = ":100000000C9434000C943E000C943E000C943E0082\n\
                         :00000001FF\n";

    fn rendered(format: ImageFormat) -> String {
        let profile = ChipProfile::resolve("m328p").unwrap();
        let records = decode_hex(BLINK).unwrap();
        let image = encode(&records, &profile, format).unwrap();
        render("optiboot-blink", &image, &profile).unwrap()
    }

    #[test]
    fn test_identifier_prefix() {
        assert_eq!(identifier_prefix("optiboot-blink"), "OPTIBOOT_BLINK");
        assert_eq!(identifier_prefix("328p.hex"), "_328P_HEX");
        assert_eq!(identifier_prefix(""), "_");
    }

    #[test]
    fn test_render_paged() {
        let source = rendered(ImageFormat::Paged);
        assert!(source.starts_with("// Generated by avrisp-codegen"));
        assert!(source.contains("static OPTIBOOT_BLINK_PAGE_0000: [u8; 128]"));
        assert!(source.contains("static OPTIBOOT_BLINK_PAGES: [Option<&[u8]>; 1]"));
        assert!(source.contains("Some(OPTIBOOT_BLINK_PAGE_0000.as_slice())"));
        assert!(source.contains("PagedImage::new("));
        assert!(source.contains("pub const OPTIBOOT_BLINK_CHIP: ChipDescriptor"));
        assert!(source.contains("0x950F"));
        syn::parse_file(&source).unwrap();
    }

    #[test]
    fn test_render_contiguous() {
        let source = rendered(ImageFormat::Contiguous);
        assert!(source.contains("static OPTIBOOT_BLINK_DATA: [u8; 16]"));
        assert!(source.contains("ContiguousImage::new("));
        syn::parse_file(&source).unwrap();
    }

    #[test]
    fn test_render_hex_lines() {
        let source = rendered(ImageFormat::HexLines);
        assert!(source.contains("static OPTIBOOT_BLINK_LINE_0: [u8; 16]"));
        assert!(source.contains("static OPTIBOOT_BLINK_LINE_1: [u8; 0]"));
        assert!(source.contains("RecordType::EndOfFile"));
        assert!(source.contains("0x82"));
        syn::parse_file(&source).unwrap();
    }
}
