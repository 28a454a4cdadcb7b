use serde::Serialize;
use std::collections::HashMap;

use crate::models::Comment;

/// 一条根评论及其下全部回复 (按时间顺序平铺)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootCommentGroup {
    pub root: Comment,
    pub replies: Vec<Comment>,
}

/// 把一篇文章的评论 (调用方保证已按 create_time 升序) 折叠成 "根评论 -> 回复列表" 两层结构。
///
/// 回复归属于 `root_id`，缺失时退回 `parent_id`；归属的根不存在时该回复被丢弃。
pub fn build_comment_tree(comments: Vec<Comment>) -> Vec<RootCommentGroup> {
    let (roots, replies): (Vec<Comment>, Vec<Comment>) =
        comments.into_iter().partition(Comment::is_root);

    let mut replies_by_root: HashMap<i64, Vec<Comment>> =
        roots.iter().map(|root| (root.id, Vec::new())).collect();

    for reply in replies {
        let Some(owner) = reply.root_id.or(reply.parent_id) else {
            tracing::debug!("Dropping comment {} without root or parent", reply.id);
            continue;
        };
        match replies_by_root.get_mut(&owner) {
            Some(bucket) => bucket.push(reply),
            None => tracing::debug!("Dropping orphaned reply {} (root {})", reply.id, owner),
        }
    }

    roots
        .into_iter()
        .map(|root| {
            let replies = replies_by_root.remove(&root.id).unwrap_or_default();
            RootCommentGroup { root, replies }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn comment(
        id: i64,
        parent_id: Option<i64>,
        root_id: Option<i64>,
        depth: u32,
    ) -> Comment {
        let create_time = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            + chrono::Duration::seconds(id);
        Comment {
            id,
            article_id: 1,
            user_id: 1,
            author_name: format!("user{}", id),
            author_avatar: None,
            is_guest: false,
            content: format!("comment {}", id),
            parent_id,
            root_id,
            depth,
            reply_to_name: None,
            create_time,
        }
    }

    fn ids(comments: &[Comment]) -> Vec<i64> {
        comments.iter().map(|c| c.id).collect()
    }

    #[test]
    fn test_empty_article() {
        assert!(build_comment_tree(Vec::new()).is_empty());
    }

    #[test]
    fn test_reply_to_reply_collapses_under_root() {
        let a = comment(1, None, None, 0);
        let b = comment(2, Some(1), Some(1), 1);
        let c = comment(3, Some(2), Some(1), 1);

        let tree = build_comment_tree(vec![a.clone(), b, c]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].root, a);
        assert_eq!(ids(&tree[0].replies), vec![2, 3]);
    }

    #[test]
    fn test_roots_and_replies_keep_input_order() {
        let input = vec![
            comment(1, None, None, 0),
            comment(2, None, None, 0),
            comment(3, Some(2), Some(2), 1),
            comment(4, Some(1), Some(1), 1),
            comment(5, Some(3), Some(2), 2),
            comment(6, None, None, 0),
            comment(7, Some(2), Some(2), 1),
        ];

        let tree = build_comment_tree(input);

        let roots: Vec<i64> = tree.iter().map(|g| g.root.id).collect();
        assert_eq!(roots, vec![1, 2, 6]);
        assert_eq!(ids(&tree[0].replies), vec![4]);
        assert_eq!(ids(&tree[1].replies), vec![3, 5, 7]);
        assert!(tree[2].replies.is_empty());
        for group in &tree {
            for reply in &group.replies {
                assert_eq!(reply.root_id, Some(group.root.id));
            }
        }
    }

    #[test]
    fn test_missing_root_id_falls_back_to_parent() {
        let tree = build_comment_tree(vec![
            comment(1, None, None, 0),
            comment(2, Some(1), None, 1),
        ]);

        assert_eq!(tree.len(), 1);
        assert_eq!(ids(&tree[0].replies), vec![2]);
    }

    #[test]
    fn test_orphaned_replies_are_dropped() {
        let tree = build_comment_tree(vec![
            comment(1, None, None, 0),
            comment(2, Some(99), Some(99), 1),
            comment(3, Some(98), None, 1),
            comment(4, Some(1), Some(1), 1),
        ]);

        assert_eq!(tree.len(), 1);
        assert_eq!(ids(&tree[0].replies), vec![4]);
    }

    #[test]
    fn test_parentless_comment_with_depth_is_not_a_root() {
        // depth > 0 却没有 parent/root：既不是根也无法归属
        let tree = build_comment_tree(vec![comment(1, None, None, 0), comment(2, None, None, 1)]);

        assert_eq!(tree.len(), 1);
        assert!(tree[0].replies.is_empty());
    }
}
