// ==========================================
// 电力结算报表归一化系统 - 电站注册表
// ==========================================
// 职责: 实体名规范化、别名折叠、州级排除、区域映射
// 存储: 内置表 + JSON 覆盖文件 (运行时加载一次,视为配置)
// 红线: canon 必须纯函数且幂等
// ==========================================

use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fs;
use std::path::Path;

// ==========================================
// StationRegistry - 电站注册表
// ==========================================
#[derive(Debug, Clone)]
pub struct StationRegistry {
    aliases: HashMap<String, String>, // 规范化别名 -> 规范 ID (多对一)
    deny_exact: BTreeSet<String>,     // 精确排除 (州级/汇总级标识)
    deny_contains: Vec<String>,       // 包含排除
    deny_suffixes: Vec<String>,       // 后缀排除
    state_tokens: BTreeSet<String>,   // 州/联邦属地名及缩写
    regions: HashMap<String, RegionEntry>, // 规范 ID -> 区域信息
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegionEntry {
    pub state: String,          // 所属州
    pub regional_group: String, // 区域组 (NR/SR/WR/ER/NER)
}

// JSON 覆盖文件结构 (各字段在内置表基础上扩展,别名同键覆盖)
#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    aliases: HashMap<String, String>,
    #[serde(default)]
    deny_exact: Vec<String>,
    #[serde(default)]
    deny_contains: Vec<String>,
    #[serde(default)]
    deny_suffixes: Vec<String>,
    #[serde(default)]
    state_tokens: Vec<String>,
    #[serde(default)]
    regions: HashMap<String, RegionEntry>,
}

impl StationRegistry {
    /// 实体名规范化 (纯函数,幂等)
    ///
    /// 大写化,非字母数字的连续串折叠为单个下划线,去除首尾下划线
    pub fn canon(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut pending_sep = false;
        for c in raw.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_sep && !out.is_empty() {
                    out.push('_');
                }
                pending_sep = false;
                out.push(c.to_ascii_uppercase());
            } else {
                pending_sep = true;
            }
        }
        out
    }

    /// 规范化 + 别名折叠 + 排除过滤
    ///
    /// # 返回
    /// - Some(id): 电站级规范 ID
    /// - None: 空名或州级/汇总级标识 (调用方静默丢弃该行)
    pub fn resolve(&self, raw: &str) -> Option<String> {
        let mut id = Self::canon(raw);
        if id.is_empty() {
            return None;
        }
        if let Some(target) = self.aliases.get(&id) {
            id = target.clone();
        }
        if self.is_denied(&id) {
            return None;
        }
        Some(id)
    }

    /// 是否命中排除规则 (入参须已规范化)
    pub fn is_denied(&self, id: &str) -> bool {
        if self.deny_exact.contains(id) || self.state_tokens.contains(id) {
            return true;
        }
        if self.deny_suffixes.iter().any(|s| id.ends_with(s.as_str())) {
            return true;
        }
        self.deny_contains.iter().any(|c| id.contains(c.as_str()))
    }

    /// 区域查询: 精确匹配优先,其次双向包含匹配
    ///
    /// # 返回
    /// - (state, regional_group),未命中时均为 "Unknown"
    pub fn region_of(&self, id: &str) -> (String, String) {
        if let Some(entry) = self.regions.get(id) {
            return (entry.state.clone(), entry.regional_group.clone());
        }
        for (key, entry) in self.regions.iter() {
            if id.contains(key.as_str()) || key.contains(id) {
                return (entry.state.clone(), entry.regional_group.clone());
            }
        }
        ("Unknown".to_string(), "Unknown".to_string())
    }

    /// 从 JSON 覆盖文件加载 (在内置表基础上扩展)
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let raw = fs::read_to_string(path.as_ref())?;
        let file: RegistryFile = serde_json::from_str(&raw)?;
        let mut registry = Self::builtin();

        for (alias, target) in file.aliases {
            registry
                .aliases
                .insert(Self::canon(&alias), Self::canon(&target));
        }
        registry
            .deny_exact
            .extend(file.deny_exact.iter().map(|t| Self::canon(t)));
        registry
            .deny_contains
            .extend(file.deny_contains.iter().map(|t| Self::canon(t)));
        registry
            .deny_suffixes
            .extend(file.deny_suffixes.iter().map(|t| Self::canon(t)));
        registry
            .state_tokens
            .extend(file.state_tokens.iter().map(|t| Self::canon(t)));
        for (id, entry) in file.regions {
            registry.regions.insert(Self::canon(&id), entry);
        }

        Ok(registry)
    }

    /// 内置注册表
    pub fn builtin() -> Self {
        let aliases: HashMap<String, String> = [
            ("RAMAGUNDEM_STPS", "RAMAGUNDAM_STPS"),
            ("VINDHYACHAL_STPS", "VSTPS"),
            ("KORBA_STPS", "KSTPS"),
            ("TALCHER_STPS", "TSTPS"),
            ("KUDANKULAM_NPP", "KKNPP"),
            ("NEYVELI_TPS_I", "NEYVELI_TPS1"),
            ("NEYVELI_TPS_II", "NEYVELI_TPS2"),
        ]
        .iter()
        .map(|(a, t)| (a.to_string(), t.to_string()))
        .collect();

        let deny_exact: BTreeSet<String> = [
            "UNKNOWN", "NR", "SR", "WR", "ER", "NER", "REGION", "REGIONAL", "TOTAL",
            "GRAND_TOTAL", "SUMMARY", "NAN", "NONE", "NULL", "NA", "DATE", "TIME",
            "BLOCK", "FREQUENCY", "STATE", "STATES_UT", "ENTITY", "POOL", "ALL",
            "DSM", "RATE", "RATES",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let deny_contains = vec!["TOTAL_AMOUNT_TO_THE_POOL".to_string()];

        let deny_suffixes = vec!["_STATE".to_string(), "_REGION".to_string()];

        let state_tokens: BTreeSet<String> = [
            // 南部区域
            "ANDHRA_PRADESH", "AP", "TELANGANA", "TS", "KARNATAKA", "KERALA",
            "TAMIL_NADU", "TN", "PUDUCHERRY", "PONDICHERRY",
            // 北部区域
            "PUNJAB", "HARYANA", "RAJASTHAN", "UTTAR_PRADESH", "UP", "UTTARAKHAND",
            "DELHI", "HIMACHAL_PRADESH", "HP", "JAMMU_KASHMIR", "JK", "CHANDIGARH",
            // 西部区域
            "GUJARAT", "MAHARASHTRA", "MADHYA_PRADESH", "MP", "CHHATTISGARH", "GOA",
            "DAMAN_DIU", "DD", "DADRA_NAGAR_HAVELI", "DNH",
            // 东部/东北部区域
            "BIHAR", "JHARKHAND", "ODISHA", "ORISSA", "WEST_BENGAL", "WB", "SIKKIM",
            "ASSAM", "MEGHALAYA", "TRIPURA", "MANIPUR", "MIZORAM", "NAGALAND",
            "ARUNACHAL_PRADESH",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let regions: HashMap<String, RegionEntry> = [
            ("RAMAGUNDAM_STPS", "TELANGANA", "SR"),
            ("SIMHADRI", "ANDHRA_PRADESH", "SR"),
            ("NEYVELI_TPS1", "TAMIL_NADU", "SR"),
            ("NEYVELI_TPS2", "TAMIL_NADU", "SR"),
            ("KAIGA", "KARNATAKA", "SR"),
            ("MAPS", "TAMIL_NADU", "SR"),
            ("KKNPP", "TAMIL_NADU", "SR"),
            ("SINGRAULI_STPS", "UTTAR_PRADESH", "NR"),
            ("RIHAND_STPS", "UTTAR_PRADESH", "NR"),
            ("DADRI", "UTTAR_PRADESH", "NR"),
            ("ANTA_GPS", "RAJASTHAN", "NR"),
            ("AURAIYA_GPS", "UTTAR_PRADESH", "NR"),
            ("NAPP", "UTTAR_PRADESH", "NR"),
            ("RAPP", "RAJASTHAN", "NR"),
            ("TEHRI_HEP", "UTTARAKHAND", "NR"),
            ("VSTPS", "MADHYA_PRADESH", "WR"),
            ("KSTPS", "CHHATTISGARH", "WR"),
            ("SIPAT_STPS", "CHHATTISGARH", "WR"),
            ("KAPS", "GUJARAT", "WR"),
            ("TAPS", "MAHARASHTRA", "WR"),
            ("SASAN_UMPP", "MADHYA_PRADESH", "WR"),
            ("TSTPS", "ODISHA", "ER"),
            ("FARAKKA_STPS", "WEST_BENGAL", "ER"),
            ("KAHALGAON_STPS", "BIHAR", "ER"),
        ]
        .iter()
        .map(|(id, state, group)| {
            (
                id.to_string(),
                RegionEntry {
                    state: state.to_string(),
                    regional_group: group.to_string(),
                },
            )
        })
        .collect();

        StationRegistry {
            aliases,
            deny_exact,
            deny_contains,
            deny_suffixes,
            state_tokens,
            regions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canon_idempotent() {
        let samples = [
            "xyz tps",
            "  XYZ-TPS  ",
            "Ramagundam STPS (Stage-I)",
            "___",
            "",
            "a  b\tc",
        ];
        for s in samples.iter() {
            let once = StationRegistry::canon(s);
            let twice = StationRegistry::canon(&once);
            assert_eq!(once, twice, "canon 须幂等: {:?}", s);
        }
    }

    #[test]
    fn test_canon_basic() {
        assert_eq!(StationRegistry::canon("xyz tps"), "XYZ_TPS");
        assert_eq!(StationRegistry::canon("  XYZ-TPS  "), "XYZ_TPS");
        assert_eq!(
            StationRegistry::canon("Ramagundam STPS (Stage-I)"),
            "RAMAGUNDAM_STPS_STAGE_I"
        );
        assert_eq!(StationRegistry::canon("___"), "");
        assert_eq!(StationRegistry::canon(""), "");
    }

    #[test]
    fn test_resolve_alias_fold() {
        let registry = StationRegistry::builtin();
        assert_eq!(
            registry.resolve("Ramagundem STPS"),
            Some("RAMAGUNDAM_STPS".to_string())
        );
        assert_eq!(registry.resolve("Vindhyachal-STPS"), Some("VSTPS".to_string()));
    }

    #[test]
    fn test_resolve_denies_aggregate_tokens() {
        let registry = StationRegistry::builtin();
        assert_eq!(registry.resolve("Tamil Nadu"), None);
        assert_eq!(registry.resolve("TOTAL"), None);
        assert_eq!(registry.resolve("Kerala State"), None); // 后缀 _STATE
        assert_eq!(registry.resolve("Total Amount to the Pool"), None);
        assert_eq!(registry.resolve(""), None);
        assert_eq!(registry.resolve("xyz tps"), Some("XYZ_TPS".to_string()));
    }

    #[test]
    fn test_region_of_containment() {
        let registry = StationRegistry::builtin();
        assert_eq!(
            registry.region_of("RAMAGUNDAM_STPS"),
            ("TELANGANA".to_string(), "SR".to_string())
        );
        // 包含匹配: 带期号的电站名落到同一区域
        assert_eq!(
            registry.region_of("SIPAT_STPS_STAGE_II"),
            ("CHHATTISGARH".to_string(), "WR".to_string())
        );
        assert_eq!(
            registry.region_of("NOWHERE_TPS"),
            ("Unknown".to_string(), "Unknown".to_string())
        );
    }

    #[test]
    fn test_json_override_extends_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(
            &path,
            r#"{
                "aliases": {"xyz tps 1": "XYZ_TPS"},
                "deny_exact": ["SSSSS"],
                "regions": {"XYZ_TPS": {"state": "KERALA", "regional_group": "SR"}}
            }"#,
        )
        .unwrap();

        let registry = StationRegistry::from_json_file(&path).unwrap();
        assert_eq!(registry.resolve("XYZ TPS 1"), Some("XYZ_TPS".to_string()));
        assert_eq!(registry.resolve("sssss"), None);
        assert_eq!(
            registry.region_of("XYZ_TPS"),
            ("KERALA".to_string(), "SR".to_string())
        );
        // 内置别名仍然生效
        assert_eq!(
            registry.resolve("Ramagundem STPS"),
            Some("RAMAGUNDAM_STPS".to_string())
        );
    }
}
