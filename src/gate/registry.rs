//! Registry-backed flag store (`HKLM\...\embeddedmode\Parameters\Flags`).

use std::io;

use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ, KEY_SET_VALUE, RegType};
use winreg::{RegKey, RegValue};

use crate::gate::error::{GateError, GateResult};
use crate::gate::{FlagKind, FlagStore, FlagValue};

const PARAMETERS_KEY: &str = r"SYSTEM\CurrentControlSet\Services\embeddedmode\Parameters";
const FLAGS_VALUE: &str = "Flags";

/// Reads and writes the embedded-mode flag in the local machine hive.
#[derive(Debug, Default)]
pub struct RegistryFlagStore;

fn store_error(operation: &str, source: io::Error) -> GateError {
    GateError::Store {
        operation: format!("{operation} {PARAMETERS_KEY}\\{FLAGS_VALUE}"),
        source,
    }
}

impl FlagStore for RegistryFlagStore {
    fn read(&self) -> GateResult<Option<FlagValue>> {
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let key = match hklm.open_subkey_with_flags(PARAMETERS_KEY, KEY_READ) {
            Ok(key) => key,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(store_error("open", e)),
        };
        match key.get_raw_value(FLAGS_VALUE) {
            Ok(value) => Ok(Some(FlagValue {
                kind: from_reg_type(&value.vtype),
                data: value.bytes,
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(store_error("read", e)),
        }
    }

    fn write(&mut self, value: &FlagValue) -> GateResult<()> {
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let (key, _) = hklm
            .create_subkey(PARAMETERS_KEY)
            .map_err(|e| store_error("create", e))?;
        let raw = RegValue {
            bytes: value.data.clone(),
            vtype: to_reg_type(value.kind),
        };
        key.set_raw_value(FLAGS_VALUE, &raw)
            .map_err(|e| store_error("write", e))
    }

    fn delete(&mut self) -> GateResult<()> {
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let key = match hklm.open_subkey_with_flags(PARAMETERS_KEY, KEY_SET_VALUE) {
            Ok(key) => key,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(store_error("open", e)),
        };
        match key.delete_value(FLAGS_VALUE) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(store_error("delete", e)),
        }
    }
}

fn from_reg_type(vtype: &RegType) -> FlagKind {
    match vtype {
        RegType::REG_NONE => FlagKind::None,
        RegType::REG_SZ => FlagKind::String,
        RegType::REG_EXPAND_SZ => FlagKind::ExpandString,
        RegType::REG_BINARY => FlagKind::Binary,
        RegType::REG_DWORD => FlagKind::DWord,
        RegType::REG_DWORD_BIG_ENDIAN => FlagKind::DWordBigEndian,
        RegType::REG_LINK => FlagKind::Link,
        RegType::REG_MULTI_SZ => FlagKind::MultiString,
        RegType::REG_RESOURCE_LIST => FlagKind::ResourceList,
        RegType::REG_FULL_RESOURCE_DESCRIPTOR => FlagKind::FullResourceDescriptor,
        RegType::REG_RESOURCE_REQUIREMENTS_LIST => FlagKind::ResourceRequirementsList,
        RegType::REG_QWORD => FlagKind::QWord,
    }
}

fn to_reg_type(kind: FlagKind) -> RegType {
    match kind {
        FlagKind::None => RegType::REG_NONE,
        FlagKind::String => RegType::REG_SZ,
        FlagKind::ExpandString => RegType::REG_EXPAND_SZ,
        FlagKind::Binary => RegType::REG_BINARY,
        FlagKind::DWord => RegType::REG_DWORD,
        FlagKind::DWordBigEndian => RegType::REG_DWORD_BIG_ENDIAN,
        FlagKind::Link => RegType::REG_LINK,
        FlagKind::MultiString => RegType::REG_MULTI_SZ,
        FlagKind::ResourceList => RegType::REG_RESOURCE_LIST,
        FlagKind::FullResourceDescriptor => RegType::REG_FULL_RESOURCE_DESCRIPTOR,
        FlagKind::ResourceRequirementsList => RegType::REG_RESOURCE_REQUIREMENTS_LIST,
        FlagKind::QWord => RegType::REG_QWORD,
    }
}
