// Zdisasm - A static Z80 disassembler reconstructing control flow of binaries
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Label names.
//!
//! Names are assigned in two passes. The first pass counts the labels of
//! each category to know how many digits the index needs, the second pass
//! assigns the names in address order:
//! - `SUB001`, `LBL01`, `DATA1`, `SELF_MOD1` (data labels on code)
//! - `RST38` for restarts
//! - `.sub001_l`, `.sub001_loop2` for labels local to a parent

use super::Disassembler;
use crate::format::hex2;
use crate::label::LabelId;
use crate::memory::MemAttribute;
use crate::numbertype::NumberType;
use std::collections::BTreeMap;

/// Extension trait for naming labels.
pub trait LabelNamer {
    /// Assign a name to every label that has none.
    fn assign_label_names(&mut self);
}

impl LabelNamer for Disassembler {
    fn assign_label_names(&mut self) {
        if let Some(function) = &self.label_name_fn {
            for id in self.labels.ids() {
                let address = self.labels[id].address;
                self.labels[id].name = Some(function(address));
            }
            return;
        }

        let mut sub_count = 0;
        let mut lbl_count = 0;
        let mut data_count = 0;
        let mut self_mod_count = 0;
        let mut local_labels: BTreeMap<LabelId, Vec<LabelId>> = BTreeMap::new();
        let mut local_loops: BTreeMap<LabelId, Vec<LabelId>> = BTreeMap::new();

        for label in self.labels.iter() {
            match label.label_type {
                NumberType::CodeSub => sub_count += 1,
                NumberType::CodeLbl => lbl_count += 1,
                NumberType::DataLbl => {
                    if self.is_self_modifying(label.address) {
                        self_mod_count += 1;
                    } else {
                        data_count += 1;
                    }
                }
                local if local.is_local() => {
                    // addresses queued by hand may have no parent
                    if let Some(parent) = self.address_parents[label.address as usize] {
                        let locals = if local == NumberType::CodeLocalLbl {
                            &mut local_labels
                        } else {
                            &mut local_loops
                        };
                        locals.entry(parent).or_default().push(label.id);
                    }
                }
                _ => {}
            }
        }

        let sub_digits = digit_count(sub_count);
        let lbl_digits = digit_count(lbl_count);
        let data_digits = digit_count(data_count);
        let self_mod_digits = digit_count(self_mod_count);

        let mut sub_index = 1;
        let mut lbl_index = 1;
        let mut data_index = 1;
        let mut self_mod_index = 1;

        let prefixes = self.config.prefixes.clone();
        for id in self.labels.ids() {
            let label = &self.labels[id];
            if label.name.is_some() {
                continue;
            }

            let name = match label.label_type {
                NumberType::CodeSub => {
                    let name = if label.belongs_to_interrupt {
                        prefixes.interrupt.clone()
                    } else {
                        format!("{}{}", prefixes.sub, index(sub_index, sub_digits))
                    };
                    sub_index += 1;
                    name
                }
                NumberType::CodeLbl => {
                    let name = if label.belongs_to_interrupt {
                        prefixes.interrupt.clone()
                    } else {
                        format!("{}{}", prefixes.lbl, index(lbl_index, lbl_digits))
                    };
                    lbl_index += 1;
                    name
                }
                NumberType::CodeRst => format!("{}{}", prefixes.rst, hex2(label.address as u8)),
                NumberType::DataLbl if self.is_self_modifying(label.address) => {
                    let name = format!(
                        "{}{}",
                        prefixes.self_modifying,
                        index(self_mod_index, self_mod_digits)
                    );
                    self_mod_index += 1;
                    name
                }
                NumberType::DataLbl => {
                    let name = format!("{}{}", prefixes.data, index(data_index, data_digits));
                    data_index += 1;
                    name
                }
                _ => continue,
            };
            self.labels[id].name = Some(name);
        }

        // locals need the final parent names
        for (parents, suffix) in [
            (&local_labels, &prefixes.local_lbl),
            (&local_loops, &prefixes.local_loop),
        ] {
            for (parent, children) in parents {
                let prefix = self.labels[*parent].name_or_empty().to_lowercase();
                let digits = digit_count(children.len());
                for (position, child) in children.iter().enumerate() {
                    if self.labels[*child].name.is_some() {
                        continue;
                    }
                    let mut name = format!(".{}{}", prefix, suffix);
                    if children.len() > 1 {
                        name.push_str(&index(position + 1, digits));
                    }
                    self.labels[*child].name = Some(name);
                }
            }
        }
    }
}

impl Disassembler {
    /// A data label on code marks self-modifying code.
    fn is_self_modifying(&self, address: u16) -> bool {
        self.attribute_at(address).contains(MemAttribute::CODE)
    }
}

fn digit_count(count: usize) -> usize {
    count.to_string().len()
}

/// Zero padded index.
fn index(value: usize, digits: usize) -> String {
    format!("{:0width$}", value, width = digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index() {
        assert_eq!(index(3, 3), "003");
        assert_eq!(index(12, 1), "12");
        assert_eq!(digit_count(9), 1);
        assert_eq!(digit_count(10), 2);
    }

    #[test]
    fn test_main_label_names() {
        let mut disasm = Disassembler::new();
        disasm.set_memory(0x8000, &[0; 16]);
        for address in 0x8000..0x800a {
            disasm.labels.insert(address, NumberType::CodeSub);
        }
        disasm.labels.insert(0x800c, NumberType::DataLbl);
        disasm.labels.insert(0x0038, NumberType::CodeRst);
        disasm.assign_label_names();

        assert_eq!(disasm.labels.at(0x8000).unwrap().name.as_deref(), Some("SUB01"));
        assert_eq!(disasm.labels.at(0x8009).unwrap().name.as_deref(), Some("SUB10"));
        assert_eq!(disasm.labels.at(0x800c).unwrap().name.as_deref(), Some("DATA1"));
        assert_eq!(disasm.labels.at(0x0038).unwrap().name.as_deref(), Some("RST38"));
    }

    #[test]
    fn test_named_labels_are_kept() {
        let mut disasm = Disassembler::new();
        disasm.set_label(0x8000, Some("MAIN"), NumberType::CodeSub);
        disasm.labels.insert(0x8010, NumberType::CodeSub);
        disasm.assign_label_names();

        assert_eq!(disasm.labels.at(0x8000).unwrap().name.as_deref(), Some("MAIN"));
        assert_eq!(disasm.labels.at(0x8010).unwrap().name.as_deref(), Some("SUB1"));
    }

    #[test]
    fn test_local_names_follow_parent() {
        let mut disasm = Disassembler::new();
        let parent = disasm.labels.insert(0x8000, NumberType::CodeSub);
        disasm.labels.insert(0x8002, NumberType::CodeLocalLoop);
        disasm.labels.insert(0x8004, NumberType::CodeLocalLbl);
        disasm.labels.insert(0x8006, NumberType::CodeLocalLbl);
        for address in [0x8000, 0x8002, 0x8004, 0x8006] {
            disasm.address_parents[address] = Some(parent);
        }
        disasm.assign_label_names();

        let name = |address| disasm.labels.at(address).unwrap().name.clone().unwrap();
        assert_eq!(name(0x8000), "SUB1");
        assert_eq!(name(0x8002), ".sub1_loop");
        assert_eq!(name(0x8004), ".sub1_l1");
        assert_eq!(name(0x8006), ".sub1_l2");
    }

    #[test]
    fn test_self_modifying_data_label() {
        let mut disasm = Disassembler::new();
        disasm.set_memory(0x8000, &[0x3e, 0x00]);
        disasm
            .memory
            .add_attribute_at(0x8000, 2, MemAttribute::CODE);
        disasm.labels.insert(0x8001, NumberType::DataLbl);
        disasm.assign_label_names();

        assert_eq!(disasm.labels.at(0x8001).unwrap().name.as_deref(), Some("SELF_MOD1"));
    }

    #[test]
    fn test_custom_name_function() {
        let mut disasm = Disassembler::new();
        disasm.set_label(0x8000, Some("MAIN"), NumberType::CodeSub);
        disasm.set_label_name_fn(|address| format!("L{:04X}", address));
        disasm.assign_label_names();

        assert_eq!(disasm.labels.at(0x8000).unwrap().name.as_deref(), Some("L8000"));
    }
}
