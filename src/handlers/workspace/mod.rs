pub mod members;
pub mod workspace;

pub use members::{add_member, list_members, remove_member, update_member_role};
pub use workspace::{
    create_workspace, delete_workspace, get_workspace, list_workspaces, update_workspace,
};
