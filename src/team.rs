use std::io::Read;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub name: String,
    pub total_sprint_days: u32,
    pub days_available: u32,
}

impl TeamMember {
    pub fn availability_percentage(&self) -> u32 {
        if self.total_sprint_days == 0 {
            return 0;
        }
        (self.days_available as f64 / self.total_sprint_days as f64 * 100.0).round() as u32
    }
}

/// Mean of member percentages; an empty roster counts as fully available.
pub fn overall_availability(members: &[TeamMember]) -> f64 {
    if members.is_empty() {
        return 100.0;
    }
    let total: u32 = members.iter().map(TeamMember::availability_percentage).sum();
    (total as f64 / members.len() as f64).round()
}

/// Reads `name,totalSprintDays,daysAvailable` rows.
pub fn parse_team<R: Read>(reader: R) -> anyhow::Result<Vec<TeamMember>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut members = Vec::new();

    for (index, result) in reader.deserialize::<TeamMember>().enumerate() {
        let mut member = result.with_context(|| format!("invalid team member on row {}", index + 2))?;
        member.days_available = member.days_available.min(member.total_sprint_days);
        members.push(member);
    }

    Ok(members)
}

pub fn read_team_file(path: &std::path::Path) -> anyhow::Result<Vec<TeamMember>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open team file {}", path.display()))?;
    let members = parse_team(file)?;
    tracing::debug!(members = members.len(), "loaded team roster");
    Ok(members)
}
