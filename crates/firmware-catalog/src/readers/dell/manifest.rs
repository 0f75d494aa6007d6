/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

// Lenient event based reader for the Dell `Manifest` schema. Only the parts of
// `SoftwareComponent` that feed the normalized model are kept; `SoftwareBundle` elements are
// counted and otherwise skipped. Mismatched end tags and unknown entities do not fail the
// parse.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{CatalogError, CatalogResult};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    pub identifier: String,
    pub release_id: String,
    pub version: String,
    pub date_time: String,
    pub base_location: String,
    pub base_location_access_protocols: String,
    pub components: Vec<SoftwareComponent>,
    pub bundle_count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SoftwareComponent {
    pub path: String,
    pub package_id: String,
    pub vendor_version: String,
    pub dell_version: String,
    pub reboot_required: bool,
    pub release_date: String,
    pub release_id: String,
    pub size: String,
    pub hash_md5: String,
    pub name: String,
    pub component_type: String,
    pub criticality: String,
    pub devices: Vec<Device>,
    pub brands: Vec<Brand>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Device {
    pub component_id: String,
    pub display: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Brand {
    pub prefix: String,
    pub display: String,
    pub models: Vec<Model>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Model {
    pub system_id: String,
    pub display: String,
}

impl Brand {
    /// Every name a filter may use for the systems of this brand: "<Brand> <Model>" and the
    /// bare model.
    pub fn system_names(&self) -> impl Iterator<Item = String> + '_ {
        self.models.iter().flat_map(move |model| {
            [
                format!("{} {}", self.display.trim(), model.display.trim()),
                model.display.trim().to_string(),
            ]
        })
    }
}

pub fn parse_manifest(xml: &str) -> CatalogResult<Manifest> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    reader.check_end_names(false);

    let mut parser = ManifestParser::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                parser.open(&name, &e);
                parser.stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                parser.open(&name, &e);
                parser.close(&name);
            }
            Ok(Event::End(_)) => {
                if let Some(name) = parser.stack.pop() {
                    parser.close(&name);
                }
            }
            Ok(Event::Text(t)) => {
                let text = match t.unescape() {
                    Ok(text) => text.into_owned(),
                    // Unknown entities are kept verbatim.
                    Err(_) => String::from_utf8_lossy(&t).into_owned(),
                };
                parser.text(text);
            }
            Ok(Event::CData(c)) => {
                parser.text(String::from_utf8_lossy(&c.into_inner()).into_owned());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(CatalogError::parse(
                    "Dell manifest",
                    format!("at byte {}: {e}", reader.buffer_position()),
                ));
            }
        }
    }

    if !parser.saw_manifest {
        return Err(CatalogError::parse(
            "Dell manifest",
            "no Manifest root element",
        ));
    }
    Ok(parser.manifest)
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attributes(e: &BytesStart) -> HashMap<String, String> {
    let mut attrs = e.attributes();
    attrs.with_checks(false);
    attrs
        .flatten()
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.local_name().as_ref()).into_owned();
            let value = match a.unescape_value() {
                Ok(v) => v.into_owned(),
                Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
            };
            (key, value)
        })
        .collect()
}

#[derive(Default)]
struct ManifestParser {
    manifest: Manifest,
    stack: Vec<String>,
    component: Option<SoftwareComponent>,
    saw_manifest: bool,
}

impl ManifestParser {
    fn parent(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    fn ends_with(&self, tail: &[&str]) -> bool {
        self.stack.len() >= tail.len()
            && self.stack[self.stack.len() - tail.len()..]
                .iter()
                .zip(tail)
                .all(|(a, b)| a == b)
    }

    fn open(&mut self, name: &str, e: &BytesStart) {
        match (name, self.parent()) {
            ("Manifest", None) => {
                self.saw_manifest = true;
                let mut attrs = attributes(e);
                let mut take = |k: &str| attrs.remove(k).unwrap_or_default();
                self.manifest.identifier = take("identifier");
                self.manifest.release_id = take("releaseID");
                self.manifest.version = take("version");
                self.manifest.date_time = take("dateTime");
                self.manifest.base_location = take("baseLocation");
                self.manifest.base_location_access_protocols = take("baseLocationAccessProtocols");
            }
            ("SoftwareBundle", Some("Manifest")) => self.manifest.bundle_count += 1,
            ("SoftwareComponent", Some("Manifest")) => {
                let mut attrs = attributes(e);
                let mut take = |k: &str| attrs.remove(k).unwrap_or_default();
                self.component = Some(SoftwareComponent {
                    path: take("path"),
                    package_id: take("packageID"),
                    vendor_version: take("vendorVersion"),
                    dell_version: take("dellVersion"),
                    reboot_required: take("rebootRequired").eq_ignore_ascii_case("true"),
                    release_date: take("releaseDate"),
                    release_id: take("releaseID"),
                    size: take("size"),
                    hash_md5: take("hashMD5"),
                    ..Default::default()
                });
            }
            _ => self.open_in_component(name, e),
        }
    }

    fn open_in_component(&mut self, name: &str, e: &BytesStart) {
        let parent = self.parent().map(str::to_string);
        let Some(component) = self.component.as_mut() else {
            return;
        };
        let value_of = |k: &str| attributes(e).remove(k).unwrap_or_default();
        match (name, parent.as_deref()) {
            ("ComponentType", Some("SoftwareComponent")) => {
                component.component_type = value_of("value");
            }
            ("Criticality", Some("SoftwareComponent")) => {
                component.criticality = value_of("value");
            }
            ("Device", Some("SupportedDevices")) => component.devices.push(Device {
                component_id: value_of("componentID"),
                display: String::new(),
            }),
            ("Brand", Some("SupportedSystems")) => component.brands.push(Brand {
                prefix: value_of("prefix"),
                ..Default::default()
            }),
            ("Model", Some("Brand")) => {
                if let Some(brand) = component.brands.last_mut() {
                    brand.models.push(Model {
                        system_id: value_of("systemID"),
                        display: String::new(),
                    });
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        if name == "SoftwareComponent"
            && self.parent() == Some("Manifest")
            && let Some(component) = self.component.take()
        {
            self.manifest.components.push(component);
        }
    }

    fn text(&mut self, text: String) {
        let text = text.trim();
        if text.is_empty() || self.component.is_none() {
            return;
        }

        // Display elements come in several languages; the first one wins.
        let set_once = |slot: &mut String| {
            if slot.is_empty() {
                *slot = text.to_string();
            }
        };

        if self.ends_with(&["SoftwareComponent", "Name", "Display"]) {
            if let Some(component) = self.component.as_mut() {
                set_once(&mut component.name);
            }
        } else if self.ends_with(&["SupportedDevices", "Device", "Display"]) {
            if let Some(device) = self.component.as_mut().and_then(|c| c.devices.last_mut()) {
                set_once(&mut device.display);
            }
        } else if self.ends_with(&["Brand", "Model", "Display"]) {
            if let Some(model) = self
                .component
                .as_mut()
                .and_then(|c| c.brands.last_mut())
                .and_then(|b| b.models.last_mut())
            {
                set_once(&mut model.display);
            }
        } else if self.ends_with(&["SupportedSystems", "Brand", "Display"])
            && let Some(brand) = self.component.as_mut().and_then(|c| c.brands.last_mut())
        {
            set_once(&mut brand.display);
        }
    }
}
