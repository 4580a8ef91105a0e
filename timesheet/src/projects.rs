use clockify::{Client, Project};

pub const NO_CLIENT_ID: &str = "no-client";
pub const NO_CLIENT_NAME: &str = "No client";

/// Projects sharing one client, in the order the service listed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectGroup {
    pub client: Client,
    pub projects_count: usize,
    pub projects: Vec<Project>,
}

impl ProjectGroup {
    fn new(client: Client) -> Self {
        Self {
            client,
            projects_count: 0,
            projects: Vec::new(),
        }
    }

    fn push(&mut self, project: Project) {
        self.projects.push(project);
        self.projects_count += 1;
    }

    pub fn is_no_client(&self) -> bool {
        self.client.id == NO_CLIENT_ID
    }
}

fn no_client(workspace_id: &str) -> Client {
    Client {
        id: NO_CLIENT_ID.to_string(),
        name: NO_CLIENT_NAME.to_string(),
        email: None,
        workspace_id: workspace_id.to_string(),
    }
}

/// Groups projects by `client_id` in a single pass.
///
/// Groups appear in the order their first project appears. Projects without a
/// client land in a synthetic "no-client" group.
pub fn group_by_client(projects: Vec<Project>) -> Vec<ProjectGroup> {
    let mut groups: Vec<ProjectGroup> = Vec::new();

    for project in projects {
        let key = project.client_id.as_deref().unwrap_or(NO_CLIENT_ID);
        let position = groups.iter().position(|group| group.client.id == key);

        let group = match position {
            Some(idx) => &mut groups[idx],
            None => {
                let client = project
                    .client()
                    .unwrap_or_else(|| no_client(&project.workspace_id));
                groups.push(ProjectGroup::new(client));
                let last = groups.len() - 1;
                &mut groups[last]
            }
        };
        group.push(project);
    }

    groups
}

/// First project with the given id across all groups.
pub fn resolve_project<'a>(groups: &'a [ProjectGroup], project_id: &str) -> Option<&'a Project> {
    groups
        .iter()
        .flat_map(|group| group.projects.iter())
        .find(|project| project.id == project_id)
}

/// Project/client index built from one project load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectIndex {
    groups: Vec<ProjectGroup>,
}

impl ProjectIndex {
    pub fn new(projects: Vec<Project>) -> Self {
        Self {
            groups: group_by_client(projects),
        }
    }

    pub fn groups(&self) -> &[ProjectGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.groups.iter().flat_map(|group| group.projects.iter())
    }

    pub fn resolve(&self, project_id: &str) -> Option<&Project> {
        resolve_project(&self.groups, project_id)
    }

    /// Groups narrowed to one client; all groups when no client is given.
    pub fn for_client(&self, client_id: Option<&str>) -> Vec<&ProjectGroup> {
        self.groups
            .iter()
            .filter(|group| client_id.map_or(true, |id| group.client.id == id))
            .collect()
    }

    /// "Client - Project", as shown in project pickers.
    pub fn label(&self, project: &Project) -> String {
        let client_name = if project.client_id.is_some() {
            project.client_name.as_str()
        } else {
            NO_CLIENT_NAME
        };
        format!("{} - {}", client_name, project.name)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn project(id: &str, client: Option<(&str, &str)>) -> Project {
        Project {
            id: id.to_string(),
            name: format!("Project {}", id),
            client_id: client.map(|(id, _)| id.to_string()),
            client_name: client.map(|(_, name)| name.to_string()).unwrap_or_default(),
            workspace_id: "ws1".to_string(),
            billable: true,
            color: "#FF5722".to_string(),
            archived: false,
        }
    }

    #[test]
    fn groups_in_first_seen_order_with_no_client_group() {
        let groups = group_by_client(vec![
            project("p1", Some(("c1", "Acme"))),
            project("p2", Some(("c1", "Acme"))),
            project("p3", None),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].client.id, "c1");
        assert_eq!(groups[0].client.name, "Acme");
        assert_eq!(groups[0].projects_count, 2);
        assert!(groups[1].is_no_client());
        assert_eq!(groups[1].client.name, NO_CLIENT_NAME);
        assert_eq!(groups[1].projects_count, 1);
    }

    #[test]
    fn interleaved_clients_keep_project_order() {
        let groups = group_by_client(vec![
            project("p1", None),
            project("p2", Some(("c2", "Globex"))),
            project("p3", None),
            project("p4", Some(("c2", "Globex"))),
        ]);

        let ids: Vec<Vec<&str>> = groups
            .iter()
            .map(|g| g.projects.iter().map(|p| p.id.as_str()).collect())
            .collect();
        assert_eq!(ids, vec![vec!["p1", "p3"], vec!["p2", "p4"]]);
        assert!(groups[0].is_no_client());
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_by_client(vec![]).is_empty());
    }

    #[test]
    fn resolve_unknown_project_is_none() {
        let groups = group_by_client(vec![project("p1", Some(("c1", "Acme")))]);

        assert!(resolve_project(&groups, "missing").is_none());
        assert_eq!(resolve_project(&groups, "p1").unwrap().id, "p1");
    }

    #[test]
    fn index_narrows_to_client_and_labels_projects() {
        let index = ProjectIndex::new(vec![
            project("p1", Some(("c1", "Acme"))),
            project("p2", None),
        ]);

        assert_eq!(index.for_client(None).len(), 2);
        let acme = index.for_client(Some("c1"));
        assert_eq!(acme.len(), 1);
        assert_eq!(acme[0].client.name, "Acme");

        let p1 = index.resolve("p1").unwrap();
        assert_eq!(index.label(p1), "Acme - Project p1");
        let p2 = index.resolve("p2").unwrap();
        assert_eq!(index.label(p2), "No client - Project p2");
        assert_eq!(index.projects().count(), 2);
    }
}
