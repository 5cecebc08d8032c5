//! Static hierarchies used across harnesses.
//!
//! Each fixture returns a fresh [`SvgMap`] so tests can mutate freely.

use super::builders::{GroupBuilder, HierarchyBuilder};
use std::path::{Path, PathBuf};
use svsearch_core::hierarchy::CUSTOM_SVG_ROOT;
use svsearch_core::SvgMap;

/// root → dc/g/Population → Count_Person.
pub fn population() -> SvgMap {
    HierarchyBuilder::new()
        .root(&["dc/g/Population"])
        .group("dc/g/Population", GroupBuilder::new("Population").var("Count_Person", "Total Population"))
        .build_map()
}

/// A small demographics tree with a diamond (`dc/g/Person_Age_Female` is
/// under both `Person_Age` and `Person_Gender`), an orphan, a blocklisted
/// group and an ignored group.
pub fn demographics() -> SvgMap {
    HierarchyBuilder::new()
        .root(&["dc/g/Demographics", "dc/g/Bad", "dc/g/Uncategorized"])
        .group(
            "dc/g/Demographics",
            GroupBuilder::new("Demographics")
                .group("dc/g/Person_Age")
                .group("dc/g/Person_Gender")
                .defined_var("Count_Person", "Total Population", "mp=count,pt=Person,st=measuredValue"),
        )
        .group(
            "dc/g/Person_Age",
            GroupBuilder::new("Person By Age")
                .group("dc/g/Person_Age_Female")
                .defined_var(
                    "Count_Person_Upto5Years",
                    "Population Under 5 Years",
                    "mp=count,pt=Person,st=measuredValue,age=Upto5Years",
                ),
        )
        .group(
            "dc/g/Person_Gender",
            GroupBuilder::new("Person By Gender")
                .group("dc/g/Person_Age_Female")
                .defined_var(
                    "Count_Person_Female",
                    "Female Population",
                    "mp=count,pt=Person,st=measuredValue,gender=Female",
                )
                .defined_var(
                    "Count_Person_Male",
                    "Male Population",
                    "mp=count,pt=Person,st=measuredValue,gender=Male",
                ),
        )
        .group(
            "dc/g/Person_Age_Female",
            GroupBuilder::new("Female Person By Age").defined_var(
                "Count_Person_Upto5Years_Female",
                "Female Population Under 5 Years",
                "mp=count,pt=Person,st=measuredValue,age=Upto5Years,gender=Female",
            ),
        )
        .group("dc/g/Bad", GroupBuilder::new("Quality Issues").var("sv_bad", "Quarantined Widgets"))
        .group("dc/g/Uncategorized", GroupBuilder::new("Uncategorized").var("Mystery_Count", "Mystery Widgets"))
        .group("dc/g/Orphan", GroupBuilder::new("Lost Things").var("Lost_Widgets", "Lost Widgets"))
        .build_map()
}

/// A lower-priority source that re-lists `dc/g/Demographics` with one extra
/// variable and a conflicting name, plus the custom root.
pub fn custom_source() -> SvgMap {
    HierarchyBuilder::new()
        .group(
            "dc/g/Demographics",
            GroupBuilder::new("Demographics (custom)")
                .var("Count_Person", "Should Not Win")
                .var("Count_Household", "Households"),
        )
        .group(CUSTOM_SVG_ROOT, GroupBuilder::new("Custom Variables").var("custom/Widget_Count", "Widget Count"))
        .build_map()
}

// ---------------------------------------------------------------------------
// Fixture file helpers
// ---------------------------------------------------------------------------

/// Write `value` as JSON to `dir/name` and return the path.
pub fn write_json(dir: &Path, name: &str, value: &impl serde::Serialize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}
