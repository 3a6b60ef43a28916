//! Suite token table.
//!
//! Maps every supported suite token to one or more structured test
//! invocations. Rendering to shell text happens in [`super::script`].

const TEST_RUNNER: &str = "pytest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Desktop,
    Mobile,
}

impl Platform {
    const fn dir(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
        }
    }
}

/// Narrows a test run to a subset of the collected tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// `-m <marker>`
    Marker(&'static str),
    /// `-k <expression>`
    Keyword(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCommand {
    pub platforms: &'static [Platform],
    pub filter: Option<Filter>,
}

impl TestCommand {
    const fn new(platforms: &'static [Platform], filter: Option<Filter>) -> Self {
        Self { platforms, filter }
    }

    /// Renders the invocation for one unit, without report options.
    pub fn render(&self, unit: &str) -> String {
        let mut command = String::from(TEST_RUNNER);
        for platform in self.platforms {
            command.push_str(&format!(" tests/{unit}/{}/", platform.dir()));
        }
        match self.filter {
            Some(Filter::Marker(marker)) => command.push_str(&format!(" -m {marker}")),
            Some(Filter::Keyword(keyword)) => command.push_str(&format!(" -k {keyword}")),
            None => {}
        }
        command
    }
}

#[derive(Debug)]
pub struct SuiteEntry {
    pub token: &'static str,
    pub commands: &'static [TestCommand],
}

const BOTH: &[Platform] = &[Platform::Desktop, Platform::Mobile];
const DESKTOP: &[Platform] = &[Platform::Desktop];
const MOBILE: &[Platform] = &[Platform::Mobile];

pub const SUITES: &[SuiteEntry] = &[
    SuiteEntry {
        token: "sanity",
        commands: &[TestCommand::new(BOTH, Some(Filter::Marker("sanity")))],
    },
    SuiteEntry {
        token: "smoke",
        commands: &[TestCommand::new(BOTH, Some(Filter::Marker("smoke")))],
    },
    SuiteEntry {
        token: "all",
        commands: &[TestCommand::new(BOTH, None)],
    },
    SuiteEntry {
        token: "payouts",
        commands: &[TestCommand::new(BOTH, Some(Filter::Keyword("payouts")))],
    },
    SuiteEntry {
        token: "analytics",
        commands: &[TestCommand::new(BOTH, Some(Filter::Marker("analytics")))],
    },
    SuiteEntry {
        token: "smapp",
        commands: &[TestCommand::new(DESKTOP, Some(Filter::Keyword("smapp")))],
    },
    SuiteEntry {
        token: "desktop",
        commands: &[TestCommand::new(DESKTOP, None)],
    },
    SuiteEntry {
        token: "mobile",
        commands: &[TestCommand::new(MOBILE, None)],
    },
    SuiteEntry {
        token: "desktop_payouts",
        commands: &[TestCommand::new(DESKTOP, Some(Filter::Marker("payouts")))],
    },
    SuiteEntry {
        token: "mobile_payouts",
        commands: &[TestCommand::new(MOBILE, Some(Filter::Marker("payouts")))],
    },
    SuiteEntry {
        token: "desktop_ui",
        commands: &[TestCommand::new(DESKTOP, Some(Filter::Marker("ui")))],
    },
    SuiteEntry {
        token: "mobile_ui",
        commands: &[TestCommand::new(MOBILE, Some(Filter::Keyword("ui")))],
    },
    SuiteEntry {
        token: "desktop_analytics",
        commands: &[TestCommand::new(DESKTOP, Some(Filter::Marker("analytics")))],
    },
    SuiteEntry {
        token: "mobile_analytics",
        commands: &[TestCommand::new(MOBILE, Some(Filter::Marker("analytics")))],
    },
];

pub fn lookup(token: &str) -> Option<&'static SuiteEntry> {
    SUITES.iter().find(|entry| entry.token == token)
}
