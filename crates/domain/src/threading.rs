/// 被回复评论在建线程时需要的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentRef {
    pub id: i64,
    pub root_id: Option<i64>,
    pub depth: u32,
}

/// 新评论写入时固定下来的 parent/root/depth，之后不再重算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threading {
    pub parent_id: Option<i64>,
    pub root_id: Option<i64>,
    pub depth: u32,
}

impl Threading {
    pub fn root() -> Self {
        Self {
            parent_id: None,
            root_id: None,
            depth: 0,
        }
    }

    pub fn for_reply(parent: Option<&ParentRef>) -> Self {
        match parent {
            None => Self::root(),
            // 父评论本身是回复则继承其根，否则父评论即根
            Some(p) => Self {
                parent_id: Some(p.id),
                root_id: Some(p.root_id.unwrap_or(p.id)),
                depth: p.depth + 1,
            },
        }
    }
}
