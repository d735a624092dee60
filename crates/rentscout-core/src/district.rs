//! Taipei districts and their 591 section codes.

/// A searchable district.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct District {
    /// Romanised name used in configuration
    pub name: &'static str,
    /// Name as it appears on listing pages
    pub name_zh: &'static str,
    /// `section` query parameter on the source site
    pub code: u32,
}

/// All twelve Taipei City districts.
pub const TAIPEI_DISTRICTS: &[District] = &[
    District { name: "Da'an", name_zh: "大安區", code: 7 },
    District { name: "Zhongzheng", name_zh: "中正區", code: 8 },
    District { name: "Xinyi", name_zh: "信義區", code: 3 },
    District { name: "Songshan", name_zh: "松山區", code: 4 },
    District { name: "Zhongshan", name_zh: "中山區", code: 1 },
    District { name: "Neihu", name_zh: "內湖區", code: 5 },
    District { name: "Nangang", name_zh: "南港區", code: 6 },
    District { name: "Shilin", name_zh: "士林區", code: 10 },
    District { name: "Beitou", name_zh: "北投區", code: 11 },
    District { name: "Wanhua", name_zh: "萬華區", code: 9 },
    District { name: "Wenshan", name_zh: "文山區", code: 2 },
    District { name: "Datong", name_zh: "大同區", code: 12 },
];

/// Find a district by romanised name (case-insensitive) or Chinese name.
#[must_use]
pub fn find_district(name: &str) -> Option<&'static District> {
    let name = name.trim();
    TAIPEI_DISTRICTS
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(name) || d.name_zh == name)
}
